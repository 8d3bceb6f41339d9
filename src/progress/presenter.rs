//! Pure display derivations over the current snapshot

use super::model::ProgressSnapshot;
use crate::poller::PollerState;
use serde::Serialize;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Completion percentage in `[0, 100]`; 0 while the total is unknown.
pub fn percentage(snapshot: &ProgressSnapshot) -> u32 {
    ratio_percent(snapshot.current_units, snapshot.total_units)
}

pub(crate) fn ratio_percent(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = ((done as f64 / total as f64) * 100.0).round();
    percent.clamp(0.0, 100.0) as u32
}

/// `"500ms"`, `"5s"`, `"1m 5s"`.
pub fn format_elapsed(ms: u64) -> String {
    if ms < 1000 {
        return format!("{}ms", ms);
    }
    let seconds = ms / 1000;
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// Human readable size in base-1024 units, two decimals at most.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}

/// Everything a renderer needs for one frame of a tracked job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    pub state: PollerState,
    pub percent: u32,
    pub elapsed_label: String,
    pub message: String,
    pub records: Option<(u64, u64)>,
    pub terminal: bool,
}

impl ProgressView {
    pub fn from_status(state: PollerState, snapshot: Option<&ProgressSnapshot>) -> Self {
        match snapshot {
            Some(snapshot) => Self {
                state,
                percent: percentage(snapshot),
                elapsed_label: format_elapsed(snapshot.elapsed_ms),
                message: snapshot.message.clone(),
                records: Some((snapshot.current_units, snapshot.total_units)),
                terminal: state.is_terminal(),
            },
            None => Self {
                state,
                percent: 0,
                elapsed_label: format_elapsed(0),
                message: String::new(),
                records: None,
                terminal: state.is_terminal(),
            },
        }
    }
}
