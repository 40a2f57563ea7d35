//! Background side effects
//!
//! Some effects run after the caller already has its answer (the refund
//! restock). They are submitted here instead of being left as detached
//! futures: each job is retried with exponential backoff, its final failure is
//! logged, and [`BackgroundTasks::drain`] lets a caller wait for everything
//! queued so far.

use crate::types::SettlementError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};

/// Retry policy of a background job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff: Duration,
}

/// Runs a fallible async operation under `policy`
///
/// Returns the last error once every attempt has failed.
pub async fn retry<F, Fut, T>(policy: RetryPolicy, mut operation: F) -> Result<T, SettlementError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SettlementError>>,
{
    let mut delay = policy.backoff;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts.max(1) => return Err(e),
            Err(e) => {
                tracing::debug!(attempt, error = %e, "retrying background operation");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
        }
    }
}

/// Set of spawned background jobs
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `job` on the current tokio runtime
    ///
    /// Jobs that already finished are reaped first, so the set only holds
    /// work still in flight.
    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.try_join_next() {
            log_outcome(result);
        }
        tasks.spawn(job);
    }

    /// Number of jobs not yet reaped
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for every job submitted so far
    ///
    /// A job that panicked is logged and does not stop the drain.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        while let Some(result) = tasks.join_next().await {
            log_outcome(result);
        }
    }
}

fn log_outcome(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "background task aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = retry(policy(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SettlementError::store("adjust", "busy"))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = retry(policy(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(SettlementError::store("adjust", "down"))
        })
        .await;

        assert_eq!(result, Err(SettlementError::store("adjust", "down")));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_drain_waits_for_submitted_jobs() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            let done = Arc::clone(&done);
            tasks
                .submit(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        tasks.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_submit_reaps_finished_jobs() {
        let tasks = BackgroundTasks::new();
        for _ in 0..10 {
            tasks.submit(async {}).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        tasks
            .submit(tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(tasks.pending().await, 1);
        tasks.drain().await;
        assert_eq!(tasks.pending().await, 0);
    }
}
