//! Bounded retry with exponential backoff
//!
//! One executor is reused for every outward call: browser scans and
//! submissions, completion calls, store writes. Each call site supplies its
//! own classification predicate; failures classified transient retry with
//! growing delay, permanent failures propagate immediately without consuming
//! retry budget, and exhausting attempts converts the last transient failure
//! into a permanent one.

use std::time::Duration;

use thiserror::Error;

/// How a call site classifies one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Expected to resolve on retry (timeout, flaky navigation)
    Transient,
    /// Retrying cannot fix it (policy rejection, dead session)
    Permanent,
}

/// Terminal failure from a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation failed with a non-retryable error
    #[error("permanent failure: {0}")]
    Permanent(E),

    /// All attempts failed with transient errors
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },
}

impl<E> RetryError<E> {
    /// The underlying failure, whichever way it became terminal.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { source, .. } => source,
        }
    }

    pub fn inner(&self) -> &E {
        match self {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { source, .. } => source,
        }
    }
}

/// Attempt count and backoff schedule for one call site.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
            max_delay,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<T, E, F, Fut, C>(&self, op_name: &str, mut op: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        C: Fn(&E) -> FailureClass,
        E: std::fmt::Display,
    {
        let mut delay = self.initial_delay;
        let max_attempts = self.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if classify(&e) == FailureClass::Permanent {
                        tracing::warn!(op = op_name, error = %e, "permanent failure, not retrying");
                        return Err(RetryError::Permanent(e));
                    }
                    if attempt == max_attempts {
                        tracing::error!(
                            op = op_name,
                            attempts = max_attempts,
                            error = %e,
                            "retries exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: max_attempts,
                            source: e,
                        });
                    }
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.backoff_factor).min(self.max_delay);
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}
