//! Poll worker - fixed-cadence status loop for one operation

use crate::api::{ApiResponse, GenerationApi, ProgressResponse};
use crate::error::{ApiError, PollError};
use crate::progress::{OperationHandle, ProgressSnapshot, ProgressView};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::{Applied, PollMachine, PollerState};

/// Published after every transition or applied snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollStatus {
    pub state: PollerState,
    pub snapshot: Option<ProgressSnapshot>,
}

/// Terminal result of one poll run, delivered once.
#[derive(Debug)]
pub enum PollOutcome {
    Completed(ProgressSnapshot),
    Failed {
        error: PollError,
        last: Option<ProgressSnapshot>,
    },
    Cancelled {
        last: Option<ProgressSnapshot>,
    },
}

impl PollOutcome {
    pub fn state(&self) -> PollerState {
        match self {
            PollOutcome::Completed(_) => PollerState::Completed,
            PollOutcome::Failed { .. } => PollerState::Failed,
            PollOutcome::Cancelled { .. } => PollerState::Cancelled,
        }
    }

    pub fn last_snapshot(&self) -> Option<&ProgressSnapshot> {
        match self {
            PollOutcome::Completed(snapshot) => Some(snapshot),
            PollOutcome::Failed { last, .. } | PollOutcome::Cancelled { last } => last.as_ref(),
        }
    }
}

struct Shared {
    machine: Mutex<PollMachine>,
    status: watch::Sender<PollStatus>,
    token: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PollMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, machine: &PollMachine) {
        self.status.send_replace(PollStatus {
            state: machine.state(),
            snapshot: machine.snapshot().cloned(),
        });
    }

    fn cancel(&self) {
        let mut machine = self.lock();
        if machine.cancel() {
            self.publish(&machine);
        }
    }

    fn fail(&self) {
        let mut machine = self.lock();
        if machine.fail() {
            self.publish(&machine);
        }
    }

    fn issue(&self) -> Option<u64> {
        let mut machine = self.lock();
        if self.token.is_cancelled() {
            if machine.cancel() {
                self.publish(&machine);
            }
            return None;
        }
        machine.issue()
    }

    /// Cancellation is re-checked under the lock before anything is written.
    fn apply(&self, seq: u64, result: Result<ProgressSnapshot, PollError>) -> Applied {
        let mut machine = self.lock();
        if self.token.is_cancelled() {
            if machine.cancel() {
                self.publish(&machine);
            }
            return Applied::Discarded;
        }
        let applied = machine.apply(seq, result);
        if !matches!(applied, Applied::Discarded) {
            self.publish(&machine);
        }
        applied
    }

    fn state(&self) -> PollerState {
        self.lock().state()
    }

    fn last_snapshot(&self) -> Option<ProgressSnapshot> {
        self.lock().snapshot().cloned()
    }
}

/// Tracks one operation handle until it completes, fails or is cancelled.
///
/// The poller is bound to a cancellation token, normally a child of a
/// [`crate::LifecycleGuard`]; cancelling it stops the timer and turns any
/// in-flight response into a no-op. The server job itself is never touched.
pub struct ProgressPoller<A> {
    api: Arc<A>,
    interval: Duration,
    shared: Arc<Shared>,
}

impl<A: GenerationApi + 'static> ProgressPoller<A> {
    pub fn new(api: Arc<A>, interval: Duration, token: CancellationToken) -> Self {
        let (status, _) = watch::channel(PollStatus {
            state: PollerState::Idle,
            snapshot: None,
        });
        Self {
            api,
            interval,
            shared: Arc::new(Shared {
                machine: Mutex::new(PollMachine::new()),
                status,
                token,
            }),
        }
    }

    pub fn state(&self) -> PollerState {
        self.shared.state()
    }

    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.shared.last_snapshot()
    }

    pub fn view(&self) -> ProgressView {
        let machine = self.shared.lock();
        ProgressView::from_status(machine.state(), machine.snapshot())
    }

    pub fn subscribe(&self) -> watch::Receiver<PollStatus> {
        self.shared.status.subscribe()
    }

    /// `Idle -> Polling` and spawn the timer loop. The first fetch fires one
    /// interval after this call.
    pub fn start(&self, handle: OperationHandle) -> Result<PollerTask, PollError> {
        {
            let mut machine = self.shared.lock();
            machine.start(handle.clone())?;
            self.shared.publish(&machine);
        }
        info!(
            "poll_start: {} interval_ms={}",
            handle,
            self.interval.as_millis()
        );
        let join = tokio::spawn(run_poll_loop(
            self.api.clone(),
            handle,
            self.interval,
            self.shared.clone(),
        ));
        Ok(PollerTask {
            join,
            shared: self.shared.clone(),
        })
    }

    /// Local stop only: the server job keeps running.
    pub fn cancel(&self) {
        self.shared.token.cancel();
        self.shared.cancel();
    }
}

/// Spawned poll loop for one handle.
pub struct PollerTask {
    join: JoinHandle<PollOutcome>,
    shared: Arc<Shared>,
}

impl PollerTask {
    pub fn cancel(&self) {
        self.shared.token.cancel();
        self.shared.cancel();
    }

    /// Wait for the terminal outcome. A cancel resolves it without waiting
    /// for a fetch that is still in flight.
    pub async fn outcome(self) -> PollOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(err) => {
                let last = self.shared.last_snapshot();
                if err.is_cancelled() {
                    self.shared.cancel();
                    PollOutcome::Cancelled { last }
                } else {
                    self.shared.fail();
                    PollOutcome::Failed {
                        error: PollError::Interrupted(err.to_string()),
                        last,
                    }
                }
            }
        }
    }
}

async fn run_poll_loop<A: GenerationApi + 'static>(
    api: Arc<A>,
    handle: OperationHandle,
    period: Duration,
    shared: Arc<Shared>,
) -> PollOutcome {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.token.cancelled() => {
                shared.cancel();
                info!("poll_cancelled: {}", handle);
                return PollOutcome::Cancelled { last: shared.last_snapshot() };
            }
            _ = ticker.tick() => {}
        }

        let Some(seq) = shared.issue() else {
            info!("poll_cancelled: {}", handle);
            return PollOutcome::Cancelled {
                last: shared.last_snapshot(),
            };
        };
        debug!("poll_fetch: {} seq={}", handle, seq);

        // The request itself is never aborted. On cancel it is left to
        // finish on its own task and its reply goes nowhere.
        let fetch = {
            let api = api.clone();
            let handle = handle.clone();
            tokio::spawn(async move { api.fetch_progress(handle.as_str()).await })
        };
        let result = tokio::select! {
            biased;
            _ = shared.token.cancelled() => {
                shared.cancel();
                info!("poll_cancelled: {} seq={} in flight", handle, seq);
                return PollOutcome::Cancelled { last: shared.last_snapshot() };
            }
            joined = fetch => match joined {
                Ok(response) => interpret(response),
                Err(err) => Err(PollError::Interrupted(err.to_string())),
            },
        };

        match shared.apply(seq, result) {
            Applied::Progress => {}
            Applied::Completed(snapshot) => {
                info!(
                    "poll_completed: {} records={}/{} elapsed_ms={}",
                    handle, snapshot.current_units, snapshot.total_units, snapshot.elapsed_ms
                );
                return PollOutcome::Completed(snapshot);
            }
            Applied::Failed(error) => {
                warn!("poll_failed: {} error={}", handle, error);
                return PollOutcome::Failed {
                    error,
                    last: shared.last_snapshot(),
                };
            }
            Applied::Discarded => {
                debug!("poll_discarded: {} seq={}", handle, seq);
                if shared.state() != PollerState::Polling {
                    return PollOutcome::Cancelled {
                        last: shared.last_snapshot(),
                    };
                }
            }
        }
    }
}

fn interpret(
    response: Result<ApiResponse<ProgressResponse>, ApiError>,
) -> Result<ProgressSnapshot, PollError> {
    let envelope = response?;
    if !envelope.success {
        return Err(PollError::Rejected(envelope.message));
    }
    envelope
        .data
        .as_ref()
        .map(ProgressSnapshot::from_wire)
        .ok_or_else(|| PollError::Rejected("progress response carried no data".to_string()))
}
