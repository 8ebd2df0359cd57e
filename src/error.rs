use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while importing heartbeats from a remote data dump.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to request data dump: {0}")]
    Creation(#[source] Box<ImportError>),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("data dump with id '{dump_id}' for user '{user_id}' not found")]
    NotFound { dump_id: String, user_id: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unreadable data dump payload: {0}")]
    Payload(String),
    #[error("data dump '{dump_id}' failed on the remote side")]
    RemoteFailed { dump_id: String },
    #[error("data dump '{dump_id}' not ready after {waited:?} ({ticks} polls)")]
    PollTimeout {
        dump_id: String,
        waited: Duration,
        ticks: u64,
    },
    #[error("import cancelled")]
    Cancelled,
    #[error("configuration error: {0}")]
    Config(String),
}

impl ImportError {
    pub fn status(status: StatusCode, body: String) -> Self {
        ImportError::Status { status, body }
    }

    pub fn creation(err: ImportError) -> Self {
        ImportError::Creation(Box::new(err))
    }

    /// Transport-level failures: connection problems and non-success statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, ImportError::Http(_) | ImportError::Status { .. })
    }
}

pub type Result<T, E = ImportError> = std::result::Result<T, E>;
