//! Job submitter: starts a generation job and hands back its operation handle

use crate::api::{GenerateExcelRequest, GenerationApi};
use crate::error::SubmissionError;
use crate::progress::OperationHandle;
use log::{info, warn};
use std::sync::Arc;

pub const MIN_RECORDS: u64 = 1;
pub const MAX_RECORDS: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateParams {
    pub records: u64,
    /// Sent verbatim; no path checks are applied.
    pub file_name: Option<String>,
}

impl GenerateParams {
    pub fn new(records: u64) -> Self {
        Self {
            records,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    fn to_request(&self) -> Result<GenerateExcelRequest, SubmissionError> {
        if !(MIN_RECORDS..=MAX_RECORDS).contains(&self.records) {
            return Err(SubmissionError::InvalidRecordCount {
                got: self.records,
                min: MIN_RECORDS,
                max: MAX_RECORDS,
            });
        }
        // Blank names are dropped so the server picks one.
        let file_name = self
            .file_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .cloned();
        Ok(GenerateExcelRequest {
            records: self.records,
            file_name,
        })
    }
}

pub struct JobSubmitter<A> {
    api: Arc<A>,
}

impl<A: GenerationApi> JobSubmitter<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Not idempotent: every successful call creates a new server job.
    pub async fn submit(&self, params: &GenerateParams) -> Result<OperationHandle, SubmissionError> {
        let request = params.to_request()?;
        let response = self.api.submit_generation(&request).await.map_err(|e| {
            warn!("submit_failed: records={} error={}", request.records, e);
            SubmissionError::Api(e)
        })?;

        if !response.success {
            warn!("submit_rejected: {}", response.message);
            return Err(SubmissionError::Rejected(response.message));
        }

        let operation_id = response
            .data
            .filter(|id| !id.trim().is_empty())
            .ok_or(SubmissionError::MissingHandle)?;
        info!("submit_ok: operation_id={}", operation_id);
        Ok(OperationHandle::new(operation_id))
    }
}
