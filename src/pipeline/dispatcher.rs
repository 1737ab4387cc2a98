//! Rate- and concurrency-bounded access to the destination service.
//!
//! Every destination call (search, playlist creation, item insertion) goes
//! through [`Dispatcher::run`]. A caller first takes one of `concurrency`
//! slots, then waits for the rate gate, which spaces call starts at least
//! `min_interval` apart (a token bucket with burst 1). Both waits observe the
//! run's cancellation token.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, OwnedSemaphorePermit, Semaphore},
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::MigrationError;

#[derive(Debug)]
struct RateGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    // The lock is held while sleeping so waiters are released one interval
    // apart, in arrival order.
    async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.min_interval;
            if Instant::now() < next {
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Proof that the holder may issue one destination call. Dropping it frees
/// the concurrency slot.
#[derive(Debug)]
pub struct DispatchPermit {
    _slot: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct Dispatcher {
    slots: Arc<Semaphore>,
    concurrency: usize,
    gate: RateGate,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// `rate_per_second` calls per second at most, `concurrency` in flight.
    pub fn new(rate_per_second: u32, concurrency: usize, cancel: CancellationToken) -> Self {
        Self::with_interval(
            Duration::from_secs(1) / rate_per_second.max(1),
            concurrency,
            cancel,
        )
    }

    pub fn with_interval(
        min_interval: Duration,
        concurrency: usize,
        cancel: CancellationToken,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            slots: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            gate: RateGate::new(min_interval),
            cancel,
        }
    }

    /// Blocks until both a concurrency slot and a rate token are available.
    pub async fn acquire(&self) -> Result<DispatchPermit, MigrationError> {
        if self.cancel.is_cancelled() {
            return Err(MigrationError::DispatchCancelled);
        }

        let slot = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(stage = "slot", "dispatcher.cancelled");
                return Err(MigrationError::DispatchCancelled);
            }
            permit = self.slots.clone().acquire_owned() => {
                permit.map_err(|_| MigrationError::DispatchCancelled)?
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(stage = "rate", "dispatcher.cancelled");
                Err(MigrationError::DispatchCancelled)
            }
            _ = self.gate.wait() => Ok(DispatchPermit { _slot: slot }),
        }
    }

    /// Runs one destination call under a permit.
    pub async fn run<T, F, Fut>(&self, call: F) -> Result<T, MigrationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, MigrationError>>,
    {
        let _permit = self.acquire().await?;
        call().await
    }

    pub fn in_flight(&self) -> usize {
        self.concurrency - self.slots.available_permits()
    }

    pub fn min_interval(&self) -> Duration {
        self.gate.min_interval
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
