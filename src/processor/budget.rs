//! Process-wide worker budget.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use posterforge_common::{Error, Result, RunContext};

use super::stage;

/// Weighted counter capping how many item workers run at once.
///
/// Permits are released when dropped, so every exit path of a worker gives
/// its weight back.
#[derive(Debug, Clone)]
pub struct WorkerBudget {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerBudget {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a worker.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for one unit of budget, giving up if `ctx` stops first.
    pub async fn acquire(&self, ctx: &RunContext) -> Result<OwnedSemaphorePermit> {
        ctx.check(stage::ACQUIRE)
            .map_err(|e| Error::SemaphoreAcquire(Box::new(e)))?;

        tokio::select! {
            biased;
            cause = ctx.cancelled() => Err(Error::SemaphoreAcquire(Box::new(
                Error::cancelled(stage::ACQUIRE, cause),
            ))),
            permit = self.semaphore.clone().acquire_owned() => permit.map_err(|_| {
                Error::SemaphoreAcquire(Box::new(Error::internal("worker budget closed")))
            }),
        }
    }
}
