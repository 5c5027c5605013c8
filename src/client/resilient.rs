use super::backoff::{BackoffPolicy, RetryDecision};
use super::rate_limiter::RateLimiter;
use crate::config::ClientConfig;
use crate::error::{ExternalError, FatalError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Per-invocation retry bookkeeping. Lives only for one `execute` call.
#[derive(Debug, Clone, Default)]
pub struct RetryAttempt {
    pub attempt_number: u32,
    pub last_error: Option<ExternalError>,
    pub next_delay: Option<Duration>,
}

impl RetryAttempt {
    fn advance(&mut self, error: ExternalError, delay: Duration) {
        self.attempt_number += 1;
        self.last_error = Some(error);
        self.next_delay = Some(delay);
    }
}

/// Bounded-retry request primitive: every attempt goes through the shared
/// [`RateLimiter`], failures are classified by the [`BackoffPolicy`].
///
/// Clones share the same limiter.
#[derive(Clone)]
pub struct ResilientClient {
    limiter: Arc<RateLimiter>,
    policy: BackoffPolicy,
}

impl ResilientClient {
    pub fn new(limiter: Arc<RateLimiter>, policy: BackoffPolicy) -> Self {
        Self { limiter, policy }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            Arc::new(RateLimiter::new(config.min_interval)),
            BackoffPolicy::from_config(config),
        )
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Run `request` until it succeeds, fails fatally, or the attempt cap is
    /// reached. Never makes more than `max_attempts` underlying calls.
    pub async fn execute<T, F, Fut>(&self, mut request: F) -> Result<T, FatalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        let mut attempt = RetryAttempt::default();

        loop {
            self.limiter.acquire().await;

            let error = match request().await {
                Ok(value) => {
                    if let Some(ref recovered) = attempt.last_error {
                        tracing::debug!(
                            "[RETRY] succeeded on attempt {} after {}",
                            attempt.attempt_number + 1,
                            recovered
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            match self.policy.decide(&error, attempt.attempt_number) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        "[RETRY] attempt {}/{} failed ({}): {}; retrying in {}ms",
                        attempt.attempt_number + 1,
                        self.policy.max_attempts(),
                        error.code(),
                        error,
                        delay.as_millis()
                    );
                    attempt.advance(error, delay);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Fatal => {
                    let attempts = attempt.attempt_number + 1;
                    tracing::warn!(
                        "[RETRY] giving up after {} attempt(s) ({}): {}",
                        attempts,
                        error.code(),
                        error
                    );
                    return Err(FatalError {
                        attempts,
                        cause: error,
                    });
                }
            }
        }
    }
}
