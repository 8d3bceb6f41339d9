//! Job progress model and its display derivations

mod model;
pub mod presenter;

pub use model::{JobStatus, OperationHandle, ProgressSnapshot};
pub use presenter::{format_elapsed, format_file_size, percentage, ProgressView};
