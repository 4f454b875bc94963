//! Types that mirror the backend's JSON schema (HTTP bodies and push messages).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Cpu => "cpu",
            SortKey::Memory => "memory",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortKey::Cpu => SortKey::Memory,
            SortKey::Memory => SortKey::Cpu,
        }
    }
}

/// One point of the cpu/memory/disk time series. `at` is the backend timestamp, verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub at: String,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub created_at: String,
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl From<HistoryRecord> for Sample {
    fn from(r: HistoryRecord) -> Self {
        Sample {
            at: r.created_at,
            cpu: r.cpu,
            memory: r.memory,
            disk: r.disk,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsHistory {
    #[serde(default)]
    pub metrics: Vec<HistoryRecord>,
}

/// Current readings carried by a `metrics` push.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MetricsPayload {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Full snapshot of the process table; never merged, always replaced.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ProcessList {
    #[serde(default)]
    pub processes: Vec<ProcessRow>,
    #[serde(default)]
    pub total_count: usize,
    /// Ordering the snapshot was produced under, when the server says so.
    #[serde(default)]
    pub sort_by: Option<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Alert {
    pub metric_type: String,
    pub value: f64,
    pub threshold: f64,
    pub created_at: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsList {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginToken {
    pub access_token: String,
}

/// `{message}` on success, `{detail}` on failure; both optional in practice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ServerMessage {
    /// `detail` may be a string or a validation-error structure.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ---------- Docker / Jenkins ----------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerCounts {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub running: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageCounts {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiskUsage {
    #[serde(default)]
    pub images: f64,
    #[serde(default)]
    pub containers: f64,
    #[serde(default)]
    pub volumes: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerInfo {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub containers: ContainerCounts,
    #[serde(default)]
    pub images: ImageCounts,
    #[serde(default)]
    pub disk_usage: DiskUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerImage {
    pub id: String,
    pub repository: String,
    pub tag: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerImages {
    #[serde(default)]
    pub images: Vec<DockerImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ports: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerContainers {
    #[serde(default)]
    pub containers: Vec<DockerContainer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JenkinsBuild {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JenkinsInfo {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub last_build: JenkinsBuild,
    #[serde(default)]
    pub health_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DockerSnapshot {
    pub info: DockerInfo,
    pub images: DockerImages,
    pub containers: DockerContainers,
    pub jenkins: JenkinsInfo,
}

// ---------- Push messages ----------

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushPayload {
    Metrics(MetricsPayload),
    Processes(ProcessList),
    /// Handshake greeting; informational only.
    Connected(String),
    /// Any `type` this client does not know; applying it is a no-op.
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub payload: PushPayload,
    pub timestamp: Option<String>,
}

impl PushMessage {
    /// Parses `{type, data, timestamp}`. A known `type` whose `data` does not
    /// match its schema is an error, an unknown `type` is not.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let env: Envelope = serde_json::from_str(raw)?;
        let payload = match env.kind.as_str() {
            "metrics" => PushPayload::Metrics(serde_json::from_value(env.data)?),
            "processes" => PushPayload::Processes(serde_json::from_value(env.data)?),
            "connected" => PushPayload::Connected(env.message.unwrap_or_default()),
            _ => PushPayload::Unrecognized(env.kind),
        };
        Ok(PushMessage {
            payload,
            timestamp: env.timestamp,
        })
    }
}
