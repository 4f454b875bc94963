//! Session store: the bearer token and whether it is still usable.
//! Persisted as a one-entry JSON map under the config dir so it survives restarts:
//! $XDG_CONFIG_HOME/infrasentinel/session.json

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

use crate::profiles::config_dir;

/// Key the token is stored under inside session.json.
pub const TOKEN_KEY: &str = "infrasentinel_token";

pub fn session_path() -> PathBuf {
    config_dir().join("session.json")
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: f64,
}

/// Cloneable handle; all clones see the same credential.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    token: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    /// Store backed by `path`; loads any token already persisted there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = read_token(&path);
        Self {
            path: Some(path),
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Stores the token verbatim; validity is only judged by `is_valid`.
    pub fn set_credential(&self, raw: impl Into<String>) -> std::io::Result<()> {
        let raw = raw.into();
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(raw.clone());
        }
        self.persist(Some(&raw))
    }

    pub fn credential(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry() {
            Some(exp) => now < exp,
            None => false,
        }
    }

    /// Expiry instant decoded from the token's `exp` claim, if decodable.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.credential().as_deref().and_then(token_expiry)
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
        if let Err(e) = self.persist(None) {
            warn!("failed to clear stored session: {e}");
        }
    }

    fn persist(&self, token: Option<&str>) -> std::io::Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut map = BTreeMap::new();
        if let Some(t) = token {
            map.insert(TOKEN_KEY.to_string(), t.to_string());
        }
        let data = serde_json::to_vec_pretty(&map).map_err(std::io::Error::other)?;
        fs::write(path, data)
    }
}

fn read_token(path: &Path) -> Option<String> {
    let s = fs::read_to_string(path).ok()?;
    let mut map: BTreeMap<String, String> = match serde_json::from_str(&s) {
        Ok(m) => m,
        Err(e) => {
            debug!("ignoring unreadable session file {}: {e}", path.display());
            return None;
        }
    };
    map.remove(TOKEN_KEY)
}

/// Reads `exp` (seconds since epoch) from the JWT payload segment.
/// Anything malformed yields None rather than an error.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let segment = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    let millis = (claims.exp * 1000.0) as i64;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
pub(crate) fn token_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"admin","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}
