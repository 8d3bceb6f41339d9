//! File transfers with upload progress
//!
//! - `types`: transfer kinds and the progress value
//! - `emitter`: multipart upload that publishes byte-level progress

mod emitter;
mod types;

pub use emitter::TransferEmitter;
pub use types::{TransferKind, TransferProgress};
