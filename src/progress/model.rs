//! Progress model: operation handles and status snapshots

use crate::api::ProgressResponse;
use serde::{Deserialize, Serialize};

/// Server-issued id of one submitted job. Never reused across jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "IN_PROGRESS"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value {
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            _ => JobStatus::InProgress,
        }
    }
}

/// One status record for a job, normalized from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProgressSnapshot {
    pub current_units: u64,
    pub total_units: u64,
    pub elapsed_ms: u64,
    pub message: String,
    pub completed: bool,
    pub status: JobStatus,
}

impl ProgressSnapshot {
    /// Negative counters become 0 and `current_units` is capped at
    /// `total_units` once a total is known.
    pub fn from_wire(wire: &ProgressResponse) -> Self {
        let total_units = non_negative(wire.total_records);
        let mut current_units = non_negative(wire.current_records);
        if total_units > 0 {
            current_units = current_units.min(total_units);
        }
        let status = match wire.status.as_deref() {
            Some(raw) => JobStatus::from(raw),
            None if wire.completed => JobStatus::Completed,
            None => JobStatus::InProgress,
        };
        Self {
            current_units,
            total_units,
            elapsed_ms: non_negative(wire.elapsed_time_ms),
            message: wire.message.clone(),
            completed: wire.completed,
            status,
        }
    }

    /// Enforce per-handle monotonicity against the previously applied
    /// snapshot: elapsed time never goes backwards and `completed` never
    /// reverts. Every other field comes from `self` unchanged.
    pub fn reconcile(mut self, previous: Option<&ProgressSnapshot>) -> Self {
        if let Some(prev) = previous {
            self.elapsed_ms = self.elapsed_ms.max(prev.elapsed_ms);
            self.completed |= prev.completed;
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
