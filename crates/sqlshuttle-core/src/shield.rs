// SPDX-FileCopyrightText: 2026 sqlshuttle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation-shielded cleanup.
//!
//! Releasing a handle or reverting a half-applied transaction must not stop
//! halfway. Shielded calls ignore the caller's cancellation token and run as
//! a detached task, so dropping the awaiting future does not abort them
//! either. A cancelled token stays cancelled; the next guarded call on the
//! same context reports the cancellation.

use tracing::warn;

use crate::error::DispatchError;
use crate::executor;
use crate::slot::{SlotPermit, WorkerSlot};

/// Runs `job` on the slot to completion, regardless of caller cancellation.
///
/// Never reports cancellation; only the job's own error or a worker panic.
pub async fn run_shielded<R, T, E, F>(slot: &WorkerSlot<R>, job: F) -> Result<T, DispatchError<E>>
where
    R: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&mut SlotPermit<R>) -> Result<T, DispatchError<E>> + Send + 'static,
{
    let slot = slot.clone();
    let detached = tokio::spawn(async move {
        let permit = slot.acquire().await;
        executor::spawn_slotted(permit, job).await
    });

    match detached.await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(DispatchError::WorkerPanicked(panic.0)),
        Err(join) => {
            warn!(error = %join, "shielded cleanup task did not complete");
            Err(DispatchError::WorkerPanicked(join.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn keeps_running_after_the_caller_gives_up() {
        let slot = WorkerSlot::new(());
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        let cleanup = run_shielded::<_, _, (), _>(&slot, move |_| {
            std::thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        // Give up on the cleanup almost immediately.
        let gave_up = tokio::time::timeout(Duration::from_millis(5), cleanup).await;
        assert!(gave_up.is_err());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !finished.load(Ordering::SeqCst) {
            assert!(tokio::time::Instant::now() < deadline, "cleanup never finished");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn surfaces_the_job_error() {
        let slot = WorkerSlot::new(());
        let result = run_shielded::<_, (), _, _>(&slot, |_| Err(DispatchError::Driver("busy")))
            .await;
        assert!(matches!(result, Err(DispatchError::Driver("busy"))));
    }
}
