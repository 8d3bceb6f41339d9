//! Error taxonomy for submission, polling, transfer and configuration

use reqwest::StatusCode;
use thiserror::Error;

/// Failures of a single request against the pipeline API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("operation {0} not found")]
    NotFound(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure before a handle exists. No poller is started and no state is kept.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("record count must be between {min} and {max}, got {got}")]
    InvalidRecordCount { got: u64, min: u64, max: u64 },

    #[error("server rejected the job: {0}")]
    Rejected(String),

    #[error("server accepted the job but returned no operation id")]
    MissingHandle,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure mid-poll. The poller keeps its last applied snapshot.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("poller is not idle")]
    AlreadyStarted,

    #[error("operation {0} is unknown to the server")]
    NotFound(String),

    #[error("job failed on the server: {0}")]
    JobFailed(String),

    #[error("server rejected the progress request: {0}")]
    Rejected(String),

    #[error("poll task stopped unexpectedly: {0}")]
    Interrupted(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for PollError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(id) => PollError::NotFound(id),
            other => PollError::Api(other),
        }
    }
}

/// Failure during an upload. The published percentage keeps its last value.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("a transfer is already in flight")]
    AlreadyInFlight,

    #[error("unsupported file type for {kind}: {file_name}")]
    UnsupportedFileType {
        kind: &'static str,
        file_name: String,
    },

    #[error("transfer cancelled")]
    Cancelled,

    #[error("failed to read upload file: {0}")]
    Io(#[from] std::io::Error),

    #[error("server rejected the transfer: {0}")]
    Rejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        TransferError::Api(ApiError::Transport(err))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
