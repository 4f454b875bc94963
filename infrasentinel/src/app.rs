//! App state and main loop: input handling, pull/push plumbing, and drawing.
//!
//! All view mutation happens on this loop. Network work runs in spawned tasks whose
//! results come back as `AppEvent`s; the streaming channel reports via `ChannelEvent`s.

use std::{future::Future, io, sync::Arc, time::Duration};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::{
    sync::{mpsc, watch},
    time::sleep,
};
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, DEFAULT_ALERTS_LIMIT, DEFAULT_PROCESS_LIMIT};
use crate::error::ClientError;
use crate::history::RANGE_PRESETS;
use crate::reconcile::{PullTicket, PushOutcome, ViewState};
use crate::types::{Alert, DockerSnapshot, ProcessList, Sample};
use crate::ui::{
    alerts::draw_alerts,
    chart::draw_metrics_chart,
    docker::draw_docker,
    gauges::draw_gauges,
    header::draw_header,
    modal::{draw_kill_prompt, draw_notice, KillPrompt},
    processes::{draw_processes, follow_selection, page_size, processes_handle_key},
};
use crate::ws::{run_channel, ChannelEvent, ConnectionState};

const TICK: Duration = Duration::from_millis(50);

/// Why the dashboard stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    Quit,
    /// Session rejected, expired, or logged out; go back to the login prompt.
    LoginRequired,
}

#[derive(Debug)]
pub enum AppEvent {
    History(PullTicket, Result<Vec<Sample>, ClientError>),
    Processes(PullTicket, Result<ProcessList, ClientError>),
    Alerts(PullTicket, Result<Vec<Alert>, ClientError>),
    Docker(PullTicket, Result<DockerSnapshot, ClientError>),
    Killed(u32, Result<String, ClientError>),
    SessionExpired,
}

pub struct App {
    view: ViewState,
    api: ApiClient,
    ws_tls: Option<Arc<rustls::ClientConfig>>,
    conn: ConnectionState,

    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,

    pub selected: usize,
    pub procs_scroll_offset: usize,
    last_procs_area: Option<Rect>,

    kill: Option<KillPrompt>,
    notice: Option<String>,
    exit: Option<AppExit>,
}

impl App {
    pub fn new(api: ApiClient, range: usize, ws_tls: Option<Arc<rustls::ClientConfig>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let hook_tx = tx.clone();
        let api = api.with_auth_expired_hook(move || {
            let _ = hook_tx.send(AppEvent::SessionExpired);
        });
        Self {
            view: ViewState::new(range),
            api,
            ws_tls,
            conn: ConnectionState::Connecting,
            tx,
            rx,
            selected: 0,
            procs_scroll_offset: 0,
            last_procs_area: None,
            kill: None,
            notice: None,
            exit: None,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn connection(&self) -> ConnectionState {
        self.conn
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn kill_prompt(&self) -> Option<&KillPrompt> {
        self.kill.as_ref()
    }

    pub fn exit(&self) -> Option<AppExit> {
        self.exit
    }

    pub async fn run(&mut self) -> anyhow::Result<AppExit> {
        // Initial data, then the live channel
        self.initial_load();
        let ws_url = self.api.ws_url()?;
        let (chan_tx, mut chan_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let channel = tokio::spawn(run_channel(ws_url, self.ws_tls.clone(), chan_tx, stop_rx));

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal, &mut chan_rx).await;

        // Explicit close: the channel must not reconnect after this
        let _ = stop_tx.send(true);
        if tokio::time::timeout(Duration::from_secs(1), channel).await.is_err() {
            warn!("channel task did not stop within 1s");
        }

        // Teardown
        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        chan_rx: &mut mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> anyhow::Result<AppExit> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(k) if k.kind != KeyEventKind::Release => self.handle_key(k),
                    Event::Mouse(m) => self.handle_mouse(m),
                    _ => {}
                }
            }

            // Streamed pushes, in arrival order
            while let Ok(ev) = chan_rx.try_recv() {
                self.on_channel_event(ev);
            }
            // Pull results
            while let Ok(ev) = self.rx.try_recv() {
                self.on_app_event(ev);
            }

            if self.exit.is_none() && !self.api.session().is_valid() {
                info!("session no longer valid; returning to login");
                self.exit = Some(AppExit::LoginRequired);
            }
            if let Some(exit) = self.exit {
                return Ok(exit);
            }

            terminal.draw(|f| self.draw(f))?;
            sleep(TICK).await;
        }
    }

    fn spawn_event<F>(&self, fut: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn initial_load(&mut self) {
        let t = self.view.refresh_history();
        self.pull_history(t);
        let t = self.view.refresh_alerts();
        self.pull_alerts(t);
        let t = self.view.refresh_processes();
        self.pull_processes(t);
        let t = self.view.refresh_docker();
        self.pull_docker(t);
    }

    fn pull_history(&self, ticket: PullTicket) {
        let api = self.api.clone();
        let limit = self.view.requested_range();
        self.spawn_event(async move { AppEvent::History(ticket, api.metrics_history(limit).await) });
    }

    fn pull_processes(&self, ticket: PullTicket) {
        let api = self.api.clone();
        let sort = self.view.sort();
        self.spawn_event(async move {
            AppEvent::Processes(ticket, api.processes(sort, DEFAULT_PROCESS_LIMIT).await)
        });
    }

    fn pull_alerts(&self, ticket: PullTicket) {
        let api = self.api.clone();
        self.spawn_event(async move { AppEvent::Alerts(ticket, api.alerts(DEFAULT_ALERTS_LIMIT).await) });
    }

    fn pull_docker(&self, ticket: PullTicket) {
        let api = self.api.clone();
        self.spawn_event(async move { AppEvent::Docker(ticket, api.docker_snapshot().await) });
    }

    pub fn on_channel_event(&mut self, ev: ChannelEvent) {
        match ev {
            ChannelEvent::State(s) => self.conn = s,
            ChannelEvent::Push(msg) => {
                if self.view.on_push(msg) == PushOutcome::Applied {
                    self.clamp_selection();
                }
            }
        }
    }

    pub fn on_app_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::History(t, res) => {
                if let Some(samples) = self.pull_result("metrics history", res) {
                    self.view.apply_history(t, samples);
                }
            }
            AppEvent::Processes(t, res) => {
                if let Some(list) = self.pull_result("processes", res) {
                    if self.view.apply_processes(t, list) {
                        self.clamp_selection();
                    }
                }
            }
            AppEvent::Alerts(t, res) => {
                if let Some(alerts) = self.pull_result("alerts", res) {
                    self.view.apply_alerts(t, alerts);
                }
            }
            AppEvent::Docker(t, res) => {
                if let Some(snap) = self.pull_result("docker data", res) {
                    self.view.apply_docker(t, snap);
                }
            }
            AppEvent::Killed(pid, res) => match res {
                Ok(msg) => {
                    info!("pid {pid} terminated: {msg}");
                    self.notice = Some(msg);
                    let t = self.view.refresh_processes();
                    self.pull_processes(t);
                }
                Err(ClientError::AuthExpired) => self.exit = Some(AppExit::LoginRequired),
                Err(ClientError::ActionFailure { detail, .. }) => {
                    warn!("kill {pid} rejected: {detail}");
                    self.notice = Some(format!("Error: {detail}"));
                }
                Err(e) => {
                    error!("kill {pid} failed: {e}");
                    self.notice = Some("Failed to terminate process".into());
                }
            },
            AppEvent::SessionExpired => self.exit = Some(AppExit::LoginRequired),
        }
    }

    /// Failed pulls leave the screen as it was; only an expired session is acted on.
    fn pull_result<T>(&mut self, what: &str, res: Result<T, ClientError>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(ClientError::AuthExpired) => {
                self.exit = Some(AppExit::LoginRequired);
                None
            }
            Err(e) => {
                warn!("error loading {what}: {e}");
                None
            }
        }
    }

    fn process_count(&self) -> usize {
        self.view.processes().map(|l| l.processes.len()).unwrap_or(0)
    }

    fn clamp_selection(&mut self) {
        let n = self.process_count();
        self.selected = self.selected.min(n.saturating_sub(1));
    }

    fn procs_page(&self) -> usize {
        self.last_procs_area.map(|a| page_size(a.height)).unwrap_or(10)
    }

    pub fn handle_key(&mut self, k: KeyEvent) {
        if self.notice.is_some() {
            self.notice = None;
            return;
        }
        if let Some(prompt) = self.kill.as_mut() {
            match k.code {
                KeyCode::Char('f') | KeyCode::Char('F') => prompt.force = !prompt.force,
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.confirm_kill(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.kill = None,
                _ => {}
            }
            return;
        }

        match k.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.exit = Some(AppExit::Quit);
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let next = self.view.sort().toggled();
                let t = self.view.on_manual_sort_change(next);
                self.pull_processes(t);
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                let t = self.view.refresh_processes();
                self.pull_processes(t);
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                let t = self.view.refresh_alerts();
                self.pull_alerts(t);
            }
            KeyCode::Char('d') | KeyCode::Char('D') => {
                let t = self.view.refresh_docker();
                self.pull_docker(t);
            }
            KeyCode::Char(c @ '1'..='4') => {
                let idx = (c as usize) - ('1' as usize);
                let t = self.view.on_manual_range_change(RANGE_PRESETS[idx]);
                self.pull_history(t);
            }
            KeyCode::Char('k') | KeyCode::Char('K') => self.open_kill_prompt(),
            KeyCode::Char('L') => {
                info!("logout requested");
                self.api.session().clear();
                self.exit = Some(AppExit::LoginRequired);
            }
            _ => {
                let total = self.process_count();
                let page = self.procs_page();
                if processes_handle_key(&mut self.selected, k, total, page) {
                    self.procs_scroll_offset =
                        follow_selection(self.procs_scroll_offset, self.selected, page);
                }
            }
        }
    }

    fn handle_mouse(&mut self, m: MouseEvent) {
        let Some(area) = self.last_procs_area else { return };
        let inside = m.column >= area.x
            && m.column < area.x + area.width
            && m.row >= area.y
            && m.row < area.y + area.height;
        if !inside || self.kill.is_some() || self.notice.is_some() {
            return;
        }
        let last = self.process_count().saturating_sub(1);
        match m.kind {
            MouseEventKind::ScrollUp => self.selected = self.selected.saturating_sub(1),
            MouseEventKind::ScrollDown => self.selected = (self.selected + 1).min(last),
            _ => return,
        }
        self.procs_scroll_offset =
            follow_selection(self.procs_scroll_offset, self.selected, self.procs_page());
    }

    fn open_kill_prompt(&mut self) {
        let Some(row) = self
            .view
            .processes()
            .and_then(|l| l.processes.get(self.selected))
        else {
            return;
        };
        if row.pid == 1 {
            debug!("pid 1 is never offered for termination");
            return;
        }
        self.kill = Some(KillPrompt {
            pid: row.pid,
            name: row.name.clone(),
            force: false,
        });
    }

    fn confirm_kill(&mut self) {
        let Some(prompt) = self.kill.take() else { return };
        let api = self.api.clone();
        info!("terminating pid {} (force={})", prompt.pid, prompt.force);
        self.spawn_event(async move {
            AppEvent::Killed(prompt.pid, api.kill_process(prompt.pid, prompt.force).await)
        });
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, metric cards, chart, bottom
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),       // header
                Constraint::Length(3),       // cpu / memory / disk cards
                Constraint::Percentage(35),  // history chart
                Constraint::Min(10),         // processes (left), alerts + docker (right)
            ])
            .split(area);

        let host = self.api.base().host_str().unwrap_or("?").to_string();
        draw_header(f, rows[0], &host, self.conn, self.view.last_update());
        draw_gauges(f, rows[1], self.view.current_metrics());
        draw_metrics_chart(f, rows[2], &self.view.window().as_series(), self.view.range());

        let bottom_lr = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[3]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(bottom_lr[1]);

        // Cache for input handlers
        self.last_procs_area = Some(bottom_lr[0]);
        draw_processes(
            f,
            bottom_lr[0],
            self.view.processes(),
            self.view.sort(),
            self.selected,
            self.procs_scroll_offset,
        );
        draw_alerts(f, right[0], self.view.alerts());
        draw_docker(f, right[1], self.view.docker());

        if let Some(k) = self.kill.as_ref() {
            draw_kill_prompt(f, area, k);
        }
        if let Some(n) = self.notice.as_deref() {
            draw_notice(f, area, n);
        }
    }
}
