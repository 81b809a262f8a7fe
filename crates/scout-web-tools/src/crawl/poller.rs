//! Poll a remote job until it reaches a terminal state
//!
//! The wait is always bounded: exceeding `max_wait` fails with
//! [`Error::Timeout`], and cancelling the token fails with [`Error::Cancelled`].

use scout_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Result of one status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Pending,
    Done(T),
    Failed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    max_wait: Duration,
}

impl Poller {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Run `check` until it reports a terminal outcome.
    ///
    /// The token is observed before every check and during every sleep.
    pub async fn poll<T, F, Fut>(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        mut check: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<PollOutcome<T>>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = check() => outcome?,
            };

            match outcome {
                PollOutcome::Done(value) => {
                    tracing::debug!(job_id, attempts, "Job reached completion");
                    return Ok(value);
                }
                PollOutcome::Failed(detail) => {
                    return Err(Error::JobFailed {
                        job_id: job_id.to_string(),
                        detail,
                    });
                }
                PollOutcome::Pending => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                tracing::warn!(job_id, attempts, ?elapsed, "Job did not finish within max wait");
                return Err(Error::Timeout {
                    job_id: job_id.to_string(),
                    waited: elapsed,
                });
            }

            let nap = self.interval.min(self.max_wait - elapsed);
            tracing::debug!(job_id, attempts, ?nap, "Job still in progress");

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }
}
