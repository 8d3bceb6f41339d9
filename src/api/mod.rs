//! Pipeline API module
//!
//! - `types`: wire envelopes and payloads
//! - `client`: reqwest client and the `GenerationApi` seam

mod client;
mod types;

pub use client::{ApiClient, GenerationApi};
pub use types::{ApiResponse, FileOperationResponse, GenerateExcelRequest, ProgressResponse};
