//! Streaming channel to the backend: one WebSocket, liveness replies, reconnect with backoff.
//!
//! `ChannelManager` is the transport-free state machine; `run_channel` drives it over
//! tokio-tungstenite and forwards typed pushes to the app as `ChannelEvent`s.

use futures_util::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
};
use tokio_tungstenite::{
    connect_async, connect_async_tls_with_config, tungstenite::Message, Connector,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::types::PushMessage;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const PING_TEXT: &str = "ping";
pub const PONG_TEXT: &str = "pong";
const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_CAP_MS: u64 = 30_000;

/// `min(1000 * 2^attempt, 30000)` ms.
pub fn reconnect_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(BACKOFF_CAP_MS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// We closed it (shutdown); never reconnects.
    Explicit,
    /// Server close, network drop, or a connect attempt that failed.
    Unexpected,
}

/// What to do with one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Push(PushMessage),
    /// Send this text back; nothing is forwarded.
    Reply(&'static str),
    Dropped,
}

#[derive(Debug)]
pub struct ChannelManager {
    state: ConnectionState,
    attempts: u32,
    reconnect_pending: bool,
    torn_down: bool,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            attempts: 0,
            reconnect_pending: false,
            torn_down: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn on_open(&mut self) {
        self.state = ConnectionState::Open;
        self.attempts = 0;
    }

    pub fn on_message(&self, raw: &str) -> Inbound {
        match PushMessage::parse(raw) {
            Ok(msg) => Inbound::Push(msg),
            Err(_) if raw == PING_TEXT => Inbound::Reply(PONG_TEXT),
            Err(e) => {
                let head: String = raw.chars().take(120).collect();
                debug!("dropping unparseable frame ({e}): {head}");
                Inbound::Dropped
            }
        }
    }

    /// Errors are only logged; the close that follows drives recovery.
    pub fn on_error(&self, err: &dyn std::fmt::Display) {
        error!("channel error: {err}");
    }

    /// Returns the delay to wait before reconnecting, or None when no reconnect
    /// should be scheduled (explicit close, torn down, already pending, gave up).
    pub fn on_close(&mut self, cause: CloseCause) -> Option<Duration> {
        self.state = ConnectionState::Closed;
        if cause == CloseCause::Explicit {
            self.torn_down = true;
            self.reconnect_pending = false;
            return None;
        }
        if self.torn_down || self.reconnect_pending {
            return None;
        }
        if self.attempts >= MAX_RECONNECT_ATTEMPTS {
            warn!("channel closed; giving up after {} reconnect attempts", self.attempts);
            return None;
        }
        self.attempts += 1;
        self.reconnect_pending = true;
        let delay = reconnect_delay(self.attempts);
        info!(
            "channel closed; reconnect {}/{} in {}ms",
            self.attempts,
            MAX_RECONNECT_ATTEMPTS,
            delay.as_millis()
        );
        Some(delay)
    }

    /// Reconnect timer fired. Returns false if the timer was cancelled meanwhile.
    pub fn on_reconnect_timer(&mut self) -> bool {
        if !self.reconnect_pending || self.torn_down {
            return false;
        }
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
        true
    }

    /// Intentional shutdown: cancels any pending reconnect. Returns whether one was pending.
    pub fn teardown(&mut self) -> bool {
        let was_pending = self.reconnect_pending;
        self.torn_down = true;
        self.reconnect_pending = false;
        self.state = ConnectionState::Closed;
        was_pending
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Events the app receives from the channel task, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    State(ConnectionState),
    Push(PushMessage),
}

pub async fn connect(
    url: &Url,
    tls: Option<Arc<rustls::ClientConfig>>,
) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
    let (ws, _) = match tls {
        Some(cfg) => {
            let connector = Some(Connector::Rustls(cfg));
            connect_async_tls_with_config(url.as_str(), None, false, connector).await?
        }
        None => connect_async(url.as_str()).await?,
    };
    Ok(ws)
}

/// Owns the channel until `shutdown` flips to true or reconnects are exhausted.
pub async fn run_channel(
    url: Url,
    tls: Option<Arc<rustls::ClientConfig>>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut mgr = ChannelManager::new();
    loop {
        let _ = events.send(ChannelEvent::State(mgr.state()));
        let connected = tokio::select! {
            res = connect(&url, tls.clone()) => Some(res),
            _ = shutdown.changed() => None,
        };
        let cause = match connected {
            Some(Ok(mut ws)) => {
                mgr.on_open();
                info!("channel open: {}", redact(&url));
                let _ = events.send(ChannelEvent::State(mgr.state()));
                pump(&mut ws, &mgr, &events, &mut shutdown).await
            }
            Some(Err(e)) => {
                mgr.on_error(&e);
                CloseCause::Unexpected
            }
            None => CloseCause::Explicit,
        };

        let delay = mgr.on_close(cause);
        let _ = events.send(ChannelEvent::State(mgr.state()));
        let Some(delay) = delay else {
            return;
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                if !mgr.on_reconnect_timer() {
                    return;
                }
            }
            _ = shutdown.changed() => {
                mgr.teardown();
                debug!("pending reconnect cancelled by shutdown");
                return;
            }
        }
    }
}

async fn pump(
    ws: &mut WsStream,
    mgr: &ChannelManager,
    events: &mpsc::UnboundedSender<ChannelEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> CloseCause {
    loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match mgr.on_message(&text) {
                    Inbound::Push(msg) => {
                        if events.send(ChannelEvent::Push(msg)).is_err() {
                            // App is gone.
                            let _ = ws.close(None).await;
                            return CloseCause::Explicit;
                        }
                    }
                    Inbound::Reply(reply) => {
                        if let Err(e) = ws.send(Message::Text(reply.into())).await {
                            mgr.on_error(&e);
                        }
                    }
                    Inbound::Dropped => {}
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("channel closed by server: {frame:?}");
                    return CloseCause::Unexpected;
                }
                // tungstenite answers protocol pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    mgr.on_error(&e);
                    return CloseCause::Unexpected;
                }
                None => return CloseCause::Unexpected,
            },
            _ = shutdown.changed() => {
                let _ = ws.close(None).await;
                return CloseCause::Explicit;
            }
        }
    }
}

fn redact(url: &Url) -> String {
    let mut u = url.clone();
    u.set_query(None);
    u.to_string()
}
