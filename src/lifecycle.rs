//! Owner-scoped teardown for pollers and transfers

use crate::api::{ApiClient, GenerationApi};
use crate::poller::ProgressPoller;
use crate::transfer::TransferEmitter;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ties pollers and emitters to the lifetime of their owner.
///
/// Everything built through the guard holds a child of its token. Tearing
/// the guard down (or dropping it) stops every timer and makes late
/// responses no-ops. Server-side jobs are left running.
#[derive(Debug, Default)]
pub struct LifecycleGuard {
    token: CancellationToken,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_torn_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Idempotent.
    pub fn teardown(&self) {
        if !self.token.is_cancelled() {
            info!("lifecycle_teardown");
            self.token.cancel();
        }
    }

    pub fn poller<A: GenerationApi + 'static>(
        &self,
        api: Arc<A>,
        interval: Duration,
    ) -> ProgressPoller<A> {
        ProgressPoller::new(api, interval, self.child_token())
    }

    pub fn emitter(&self, client: ApiClient) -> TransferEmitter {
        TransferEmitter::new(client, self.child_token())
    }
}

impl Drop for LifecycleGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
