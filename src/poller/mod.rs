//! Progress poller for long-running generation jobs
//!
//! - `state`: the pure state machine (transitions, ordering, staleness)
//! - `worker`: the tokio timer loop driving it against the API

mod state;
mod worker;

pub use state::{Applied, PollMachine, PollerState};
pub use worker::{PollOutcome, PollStatus, PollerTask, ProgressPoller};
