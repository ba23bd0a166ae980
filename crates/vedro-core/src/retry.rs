//! Bounded exponential backoff around provider calls.

use std::future::Future;
use std::time::Duration;

use crate::error::{classify, ErrorClass};
use crate::model::ActionResult;

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as 1 when 0.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// `initial_delay * 2^attempt`, capped at `max_delay`. `attempt` is zero-based.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the zero-based attempt number.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 0;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let retry_after = match classify(&err) {
                ErrorClass::Transient { retry_after_ms } if attempt + 1 < attempts => {
                    retry_after_ms
                }
                ErrorClass::Transient { .. } => {
                    tracing::error!("{what} failed after {attempts} attempt(s): {err:#}");
                    return Err(err);
                }
                ErrorClass::Fatal => {
                    tracing::error!("{what} failed permanently: {err:#}");
                    return Err(err);
                }
            };

            let mut delay = self.delay_for(attempt);
            if let Some(ms) = retry_after {
                delay = delay.max(Duration::from_millis(ms)).min(self.max_delay);
            }
            tracing::warn!(
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                "{what} failed, retrying: {err}"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Like [`RetryPolicy::run`], but folds the outcome into an
    /// [`ActionResult`] whose error is `"{failure_prefix} {cause}"`.
    pub async fn run_action<T, F, Fut>(
        &self,
        what: &str,
        failure_prefix: &str,
        op: F,
    ) -> ActionResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.run(what, op).await {
            Ok(value) => ActionResult::Success(value),
            Err(e) => ActionResult::failure(format!("{failure_prefix} {e}")),
        }
    }
}
