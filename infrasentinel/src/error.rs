//! Error taxonomy shared by the session, transport and channel layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered 401, or the stored credential is missing/expired.
    /// The credential has already been cleared when this is returned.
    #[error("authentication expired")]
    AuthExpired,

    /// The backend could not be reached (DNS, refused, TLS, timeout...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A body or push payload that did not match the expected schema.
    #[error("malformed payload: {0}")]
    ParseFailure(#[from] serde_json::Error),

    /// Non-2xx answer to a request; `detail` is the server message when present.
    #[error("request failed ({status}): {detail}")]
    ActionFailure { status: u16, detail: String },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported url scheme in {0:?}; expected http:// or https://")]
    Scheme(String),
}

impl ClientError {
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
