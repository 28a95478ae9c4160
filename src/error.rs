//! Error types for Folio
//!
//! One error enum is shared by the client workflow and the gateway. The
//! gateway maps [`ErrorKind`] onto HTTP status codes; the client flattens
//! everything into a single message string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FolioError>;

/// Coarse error category exposed on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; recoverable by the user
    Validation,
    /// Unknown asset / story identifier
    NotFound,
    /// Pinning service, asset API or registrar failed
    Upstream,
    /// A credential or address needed for this request is not configured
    Config,
    /// Anything else
    Internal,
}

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    /// Error reported by a remote Folio gateway, kept with its original kind
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FolioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::Validation(_) => ErrorKind::Validation,
            FolioError::NotFound(_) => ErrorKind::NotFound,
            FolioError::Upstream(_) => ErrorKind::Upstream,
            FolioError::MissingConfig(_) => ErrorKind::Config,
            FolioError::Remote { kind, .. } => *kind,
            FolioError::Storage(_)
            | FolioError::Io(_)
            | FolioError::Json(_)
            | FolioError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Configuration problems are reported generically; the detail only goes
    /// to the server log.
    pub fn public_message(&self) -> String {
        match self {
            FolioError::MissingConfig(_) => "Server configuration error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(e: reqwest::Error) -> Self {
        FolioError::Upstream(e.to_string())
    }
}
