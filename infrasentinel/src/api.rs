//! HTTP transport for the backend's JSON API: bearer auth, 401 handling, typed endpoints.

use reqwest::{header, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::session::SessionStore;
use crate::tls::TlsSetup;
use crate::types::{
    Alert, AlertsList, DockerContainers, DockerImages, DockerInfo, DockerSnapshot, JenkinsInfo,
    LoginToken, MetricsHistory, ProcessList, Sample, ServerMessage, SortKey,
};

pub const DEFAULT_ALERTS_LIMIT: usize = 20;
pub const DEFAULT_PROCESS_LIMIT: usize = 20;

type AuthExpiredHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
    on_auth_expired: Option<AuthExpiredHook>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient").field("base", &self.base.as_str()).finish()
    }
}

/// Accepts `http(s)://host[:port][/...]`; only scheme, host and port are used.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::Scheme(raw.to_string()));
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

impl ApiClient {
    pub fn new(base: Url, session: SessionStore, tls: Option<&TlsSetup>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(10));
        if let Some(t) = tls {
            builder = builder.add_root_certificate(t.http_root.clone());
        }
        Ok(Self {
            http: builder.build()?,
            base,
            session,
            on_auth_expired: None,
        })
    }

    /// Called once per 401, after the credential has been cleared.
    pub fn with_auth_expired_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_expired = Some(Arc::new(hook));
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path_and_query: &str) -> Result<Url> {
        Ok(self.base.join(path_and_query)?)
    }

    /// Streaming endpoint: same host, ws/wss scheme, credential as `token` query param.
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.endpoint("/ws")?;
        let scheme = if self.base.scheme() == "https" { "wss" } else { "ws" };
        if url.set_scheme(scheme).is_err() {
            return Err(ClientError::Scheme(self.base.to_string()));
        }
        if let Some(token) = self.session.credential() {
            url.query_pairs_mut().append_pair("token", &token);
        }
        Ok(url)
    }

    /// Authenticated call. 401 clears the session and fails with `AuthExpired`;
    /// any other status is handed back for the caller to inspect.
    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = self.endpoint(path_and_query)?;
        let mut req = self
            .http
            .request(method.clone(), url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.credential() {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        debug!("{method} {path_and_query} -> {}", resp.status().as_u16());
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("{path_and_query}: credential rejected, clearing session");
            self.session.clear();
            if let Some(hook) = self.on_auth_expired.as_ref() {
                hook();
            }
            return Err(ClientError::AuthExpired);
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let resp = self.request(Method::GET, path_and_query, None).await?;
        decode(resp).await
    }

    /// Returns the token; the caller decides whether to store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = self.endpoint("/api/auth/login")?;
        let resp = self
            .http
            .post(url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let msg: ServerMessage = serde_json::from_slice(&bytes).unwrap_or_default();
            return Err(ClientError::ActionFailure {
                status: status.as_u16(),
                detail: msg
                    .detail_text()
                    .unwrap_or_else(|| "Login failed. Please try again.".into()),
            });
        }
        let tok: LoginToken = serde_json::from_slice(&bytes)?;
        Ok(tok.access_token)
    }

    /// History, oldest first (the endpoint answers newest first).
    pub async fn metrics_history(&self, limit: usize) -> Result<Vec<Sample>> {
        let h: MetricsHistory = self
            .get_json(&format!("/api/metrics/history?limit={limit}"))
            .await?;
        Ok(h.metrics.into_iter().rev().map(Sample::from).collect())
    }

    pub async fn alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let a: AlertsList = self
            .get_json(&format!("/api/metrics/alerts?limit={limit}"))
            .await?;
        Ok(a.alerts)
    }

    pub async fn processes(&self, sort: SortKey, limit: usize) -> Result<ProcessList> {
        let mut list: ProcessList = self
            .get_json(&format!("/api/processes?sort_by={}&limit={limit}", sort.as_str()))
            .await?;
        list.sort_by.get_or_insert(sort);
        Ok(list)
    }

    /// SIGTERM, or SIGKILL when `force`. Ok carries the server's message.
    pub async fn kill_process(&self, pid: u32, force: bool) -> Result<String> {
        let resp = self
            .request(
                Method::POST,
                &format!("/api/processes/kill/{pid}?force={force}"),
                None,
            )
            .await?;
        let status = resp.status();
        let msg: ServerMessage = serde_json::from_slice(&resp.bytes().await?).unwrap_or_default();
        if status.is_success() {
            Ok(msg
                .message
                .unwrap_or_else(|| format!("Process {pid} terminated")))
        } else {
            Err(ClientError::ActionFailure {
                status: status.as_u16(),
                detail: msg
                    .detail_text()
                    .unwrap_or_else(|| "Failed to kill process".into()),
            })
        }
    }

    pub async fn docker_info(&self) -> Result<DockerInfo> {
        self.get_json("/api/docker/info").await
    }

    pub async fn docker_images(&self) -> Result<DockerImages> {
        self.get_json("/api/docker/images").await
    }

    pub async fn docker_containers(&self) -> Result<DockerContainers> {
        self.get_json("/api/docker/containers").await
    }

    pub async fn jenkins(&self) -> Result<JenkinsInfo> {
        self.get_json("/api/docker/jenkins").await
    }

    /// All four inventory endpoints; any failure fails the whole snapshot.
    pub async fn docker_snapshot(&self) -> Result<DockerSnapshot> {
        let (info, images, containers, jenkins) = tokio::try_join!(
            self.docker_info(),
            self.docker_images(),
            self.docker_containers(),
            self.jenkins()
        )?;
        Ok(DockerSnapshot {
            info,
            images,
            containers,
            jenkins,
        })
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        let msg: ServerMessage = serde_json::from_slice(&bytes).unwrap_or_default();
        return Err(ClientError::ActionFailure {
            status: status.as_u16(),
            detail: msg
                .detail_text()
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serves one canned response and hands back the raw request head.
    async fn one_shot_server(status_line: &str, body: &str) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        (parse_base_url(&format!("http://{addr}")).unwrap(), rx)
    }

    #[test]
    fn base_and_ws_urls() {
        let base = parse_base_url("https://mon.example.com:8443/dashboard?x=1").unwrap();
        assert_eq!(base.as_str(), "https://mon.example.com:8443/");
        assert!(parse_base_url("ftp://x").is_err());
        assert!(parse_base_url("not a url").is_err());

        let session = SessionStore::in_memory();
        session.set_credential("a.b.c").unwrap();
        let api = ApiClient::new(base, session, None).unwrap();
        assert_eq!(
            api.ws_url().unwrap().as_str(),
            "wss://mon.example.com:8443/ws?token=a.b.c"
        );

        let plain = ApiClient::new(
            parse_base_url("http://127.0.0.1:8000").unwrap(),
            SessionStore::in_memory(),
            None,
        )
        .unwrap();
        assert_eq!(plain.ws_url().unwrap().as_str(), "ws://127.0.0.1:8000/ws");
    }

    #[tokio::test]
    async fn unauthorized_clears_session_and_fires_hook() {
        let (base, _req) = one_shot_server("401 Unauthorized", r#"{"detail":"expired"}"#).await;
        let session = SessionStore::in_memory();
        session.set_credential("stale").unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        let api = ApiClient::new(base, session.clone(), None)
            .unwrap()
            .with_auth_expired_hook(move || {
                f.fetch_add(1, Ordering::SeqCst);
            });

        let err = api.alerts(5).await.unwrap_err();
        assert!(err.is_auth_expired());
        assert!(session.credential().is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bearer_header_and_history_order() {
        let body = r#"{"metrics":[{"id":2,"created_at":"2024-05-01T10:00:10","cpu":2.0,"memory":1.0,"disk":1.0},{"id":1,"created_at":"2024-05-01T10:00:05","cpu":1.0,"memory":1.0,"disk":1.0}],"total":2}"#;
        let (base, req) = one_shot_server("200 OK", body).await;
        let session = SessionStore::in_memory();
        session.set_credential("tok123").unwrap();
        let api = ApiClient::new(base, session, None).unwrap();

        let samples = api.metrics_history(2).await.unwrap();
        assert_eq!(samples.iter().map(|s| s.cpu).collect::<Vec<_>>(), vec![1.0, 2.0]);

        let head = req.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /api/metrics/history?limit=2 "));
        assert!(head.contains("authorization: bearer tok123"));
        assert!(head.contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn kill_failure_carries_server_detail() {
        let (base, req) = one_shot_server("400 Bad Request", r#"{"detail":"No such process"}"#).await;
        let api = ApiClient::new(base, SessionStore::in_memory(), None).unwrap();
        match api.kill_process(4242, true).await {
            Err(ClientError::ActionFailure { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "No such process");
            }
            other => panic!("unexpected {other:?}"),
        }
        let head = req.await.unwrap();
        assert!(head.starts_with("POST /api/processes/kill/4242?force=true "));
        assert!(!head.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn processes_are_tagged_with_requested_sort() {
        let body = r#"{"processes":[],"total_count":3,"timestamp":"2024-05-01T10:00:00"}"#;
        let (base, req) = one_shot_server("200 OK", body).await;
        let api = ApiClient::new(base, SessionStore::in_memory(), None).unwrap();
        let list = api.processes(SortKey::Memory, 20).await.unwrap();
        assert_eq!(list.sort_by, Some(SortKey::Memory));
        assert_eq!(list.total_count, 3);
        assert!(req.await.unwrap().contains("sort_by=memory&limit=20"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = ApiClient::new(
            parse_base_url(&format!("http://{addr}")).unwrap(),
            SessionStore::in_memory(),
            None,
        )
        .unwrap();
        assert!(matches!(api.alerts(1).await, Err(ClientError::Transport(_))));
    }
}
