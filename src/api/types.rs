//! Wire types for the pipeline API (camelCase JSON)

use serde::{Deserialize, Serialize};

/// Envelope every endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateExcelRequest {
    pub records: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Progress record served by `GET /generate-excel/progress/{operationId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub current_records: i64,
    #[serde(default)]
    pub total_records: i64,
    #[serde(default)]
    pub elapsed_time_ms: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Result of a convert or bulk-load transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationResponse {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub records_processed: u64,
    #[serde(default)]
    pub operation: String,
}
