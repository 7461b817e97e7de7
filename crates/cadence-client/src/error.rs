use cadence_core::CadenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response. `message` is the `error` field of the body when
    /// present, otherwise the raw body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode response from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(#[from] CadenceError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
