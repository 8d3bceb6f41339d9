//! Client for the student data pipeline API.
//!
//! Submits generation jobs, polls their progress on a fixed cadence and
//! uploads files with byte-level progress. Logging goes through the `log`
//! facade; installing a logger is left to the binary.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod progress;
pub mod submit;
pub mod transfer;

pub use api::{ApiClient, GenerationApi};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError, PollError, SubmissionError, TransferError};
pub use lifecycle::LifecycleGuard;
pub use poller::{PollOutcome, PollStatus, PollerState, PollerTask, ProgressPoller};
pub use progress::{OperationHandle, ProgressSnapshot, ProgressView};
pub use submit::{GenerateParams, JobSubmitter};
pub use transfer::{TransferEmitter, TransferKind, TransferProgress};
