//! Poller state machine: transitions, issue-order sequencing and staleness

use crate::error::PollError;
use crate::progress::{OperationHandle, ProgressSnapshot};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PollerState {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "polling")]
    Polling,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl PollerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollerState::Completed | PollerState::Failed | PollerState::Cancelled
        )
    }
}

impl std::fmt::Display for PollerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollerState::Idle => write!(f, "idle"),
            PollerState::Polling => write!(f, "polling"),
            PollerState::Completed => write!(f, "completed"),
            PollerState::Failed => write!(f, "failed"),
            PollerState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What a fetched response did to the machine.
#[derive(Debug)]
pub enum Applied {
    Progress,
    Completed(ProgressSnapshot),
    Failed(PollError),
    /// Stale, out of order, or arrived after the machine left `Polling`.
    Discarded,
}

/// Single mutable slot for one poll run.
///
/// Every fetch gets a sequence number from `issue`; `apply` accepts a
/// response only while `Polling` and only if its number is newer than the
/// last applied one.
#[derive(Debug)]
pub struct PollMachine {
    state: PollerState,
    handle: Option<OperationHandle>,
    snapshot: Option<ProgressSnapshot>,
    issued: u64,
    applied: u64,
}

impl Default for PollMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollMachine {
    pub fn new() -> Self {
        Self {
            state: PollerState::Idle,
            handle: None,
            snapshot: None,
            issued: 0,
            applied: 0,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn handle(&self) -> Option<&OperationHandle> {
        self.handle.as_ref()
    }

    pub fn snapshot(&self) -> Option<&ProgressSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// `Idle -> Polling`. A machine is good for exactly one handle.
    pub fn start(&mut self, handle: OperationHandle) -> Result<(), PollError> {
        if self.state != PollerState::Idle {
            return Err(PollError::AlreadyStarted);
        }
        self.handle = Some(handle);
        self.state = PollerState::Polling;
        Ok(())
    }

    /// Sequence number for the next fetch, or `None` once terminal.
    pub fn issue(&mut self) -> Option<u64> {
        if self.state != PollerState::Polling {
            return None;
        }
        self.issued += 1;
        Some(self.issued)
    }

    pub fn apply(&mut self, seq: u64, result: Result<ProgressSnapshot, PollError>) -> Applied {
        if self.state != PollerState::Polling || seq <= self.applied || seq > self.issued {
            return Applied::Discarded;
        }
        self.applied = seq;

        let snapshot = match result {
            Ok(snapshot) => snapshot.reconcile(self.snapshot.as_ref()),
            Err(err) => {
                self.state = PollerState::Failed;
                return Applied::Failed(err);
            }
        };

        // A FAILED job also reports completed=true; keep the last good snapshot.
        if snapshot.is_failed() {
            self.state = PollerState::Failed;
            return Applied::Failed(PollError::JobFailed(snapshot.message));
        }

        if snapshot.completed {
            self.state = PollerState::Completed;
            self.snapshot = Some(snapshot.clone());
            Applied::Completed(snapshot)
        } else {
            self.snapshot = Some(snapshot);
            Applied::Progress
        }
    }

    /// `Polling -> Failed` when the run stops without a response to apply.
    pub fn fail(&mut self) -> bool {
        if self.state != PollerState::Polling {
            return false;
        }
        self.state = PollerState::Failed;
        true
    }

    /// `Polling -> Cancelled` (also `Idle -> Cancelled`). Returns false when
    /// the machine was already terminal.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = PollerState::Cancelled;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::JobStatus;

    fn snap(current: u64, total: u64, elapsed: u64, completed: bool) -> ProgressSnapshot {
        ProgressSnapshot {
            current_units: current,
            total_units: total,
            elapsed_ms: elapsed,
            message: format!("{}/{}", current, total),
            completed,
            status: if completed {
                JobStatus::Completed
            } else {
                JobStatus::InProgress
            },
        }
    }

    fn polling() -> PollMachine {
        let mut machine = PollMachine::new();
        machine.start(OperationHandle::new("op-1")).unwrap();
        machine
    }

    #[test]
    fn start_only_from_idle() {
        let mut machine = polling();
        assert_eq!(machine.state(), PollerState::Polling);
        assert!(matches!(
            machine.start(OperationHandle::new("op-2")),
            Err(PollError::AlreadyStarted)
        ));
        assert_eq!(machine.handle().unwrap().as_str(), "op-1");
    }

    #[test]
    fn idle_machine_issues_nothing() {
        let mut machine = PollMachine::new();
        assert_eq!(machine.issue(), None);
    }

    #[test]
    fn progress_replaces_snapshot_wholesale() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        assert!(matches!(
            machine.apply(seq, Ok(snap(500, 1000, 5000, false))),
            Applied::Progress
        ));

        let mut next = snap(600, 1000, 6000, false);
        next.message = "Generated 600 records".to_string();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(next.clone()));

        assert_eq!(machine.snapshot(), Some(&next));
        assert_eq!(machine.state(), PollerState::Polling);
    }

    #[test]
    fn completion_is_terminal_and_stops_issuing() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        assert!(matches!(
            machine.apply(seq, Ok(snap(1000, 1000, 9000, true))),
            Applied::Completed(_)
        ));
        assert_eq!(machine.state(), PollerState::Completed);
        assert_eq!(machine.issue(), None);
        assert!(!machine.cancel());
        assert_eq!(machine.state(), PollerState::Completed);
    }

    #[test]
    fn response_after_completion_is_discarded() {
        let mut machine = polling();
        let first = machine.issue().unwrap();
        let second = machine.issue().unwrap();
        machine.apply(second, Ok(snap(1000, 1000, 9000, true)));

        assert!(matches!(
            machine.apply(first, Ok(snap(10, 1000, 100, false))),
            Applied::Discarded
        ));
        assert_eq!(machine.snapshot().unwrap().current_units, 1000);
    }

    #[test]
    fn older_response_arriving_late_is_dropped() {
        let mut machine = polling();
        let first = machine.issue().unwrap();
        let second = machine.issue().unwrap();

        machine.apply(second, Ok(snap(700, 1000, 7000, false)));
        assert!(matches!(
            machine.apply(first, Ok(snap(300, 1000, 3000, false))),
            Applied::Discarded
        ));
        assert_eq!(machine.snapshot().unwrap().current_units, 700);
    }

    #[test]
    fn unissued_sequence_is_dropped() {
        let mut machine = polling();
        assert!(matches!(
            machine.apply(1, Ok(snap(1, 2, 3, false))),
            Applied::Discarded
        ));
        assert!(machine.snapshot().is_none());
    }

    #[test]
    fn error_fails_and_keeps_last_snapshot() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(400, 1000, 4000, false)));

        let seq = machine.issue().unwrap();
        let applied = machine.apply(seq, Err(PollError::NotFound("op-1".to_string())));

        assert!(matches!(applied, Applied::Failed(PollError::NotFound(_))));
        assert_eq!(machine.state(), PollerState::Failed);
        assert_eq!(machine.snapshot().unwrap().current_units, 400);
        assert_eq!(machine.issue(), None);
    }

    #[test]
    fn server_reported_failure_is_not_completion() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(100, 1000, 1000, false)));

        let mut failed = snap(150, 1000, 2000, true);
        failed.status = JobStatus::Failed;
        failed.message = "Failed: disk full".to_string();
        let seq = machine.issue().unwrap();

        match machine.apply(seq, Ok(failed)) {
            Applied::Failed(PollError::JobFailed(msg)) => assert_eq!(msg, "Failed: disk full"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(machine.state(), PollerState::Failed);
        assert_eq!(machine.snapshot().unwrap().current_units, 100);
    }

    #[test]
    fn response_after_cancel_does_not_mutate() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(200, 1000, 2000, false)));

        let in_flight = machine.issue().unwrap();
        assert!(machine.cancel());
        assert!(matches!(
            machine.apply(in_flight, Ok(snap(1000, 1000, 9000, true))),
            Applied::Discarded
        ));
        assert_eq!(machine.state(), PollerState::Cancelled);
        assert_eq!(machine.snapshot().unwrap().current_units, 200);
    }

    #[test]
    fn fail_only_leaves_polling() {
        let mut idle = PollMachine::new();
        assert!(!idle.fail());
        assert_eq!(idle.state(), PollerState::Idle);

        let mut machine = polling();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(300, 1000, 3000, false)));
        assert!(machine.fail());
        assert_eq!(machine.state(), PollerState::Failed);
        assert_eq!(machine.snapshot().unwrap().current_units, 300);
        assert_eq!(machine.issue(), None);
        assert!(!machine.fail());
        assert!(!machine.cancel());
    }

    #[test]
    fn elapsed_regression_is_clamped() {
        let mut machine = polling();
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(200, 1000, 8000, false)));
        let seq = machine.issue().unwrap();
        machine.apply(seq, Ok(snap(300, 1000, 6000, false)));
        assert_eq!(machine.snapshot().unwrap().elapsed_ms, 8000);
    }

    #[test]
    fn state_display_matches_expected_strings() {
        assert_eq!(PollerState::Idle.to_string(), "idle");
        assert_eq!(PollerState::Polling.to_string(), "polling");
        assert_eq!(PollerState::Completed.to_string(), "completed");
        assert_eq!(PollerState::Failed.to_string(), "failed");
        assert_eq!(PollerState::Cancelled.to_string(), "cancelled");
    }
}
