use crate::config::ClientConfig;
use crate::error::ExternalError;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Fatal,
}

/// Exponential backoff with a fixed attempt cap.
///
/// Attempt numbers are 0-indexed: the delay after the first failure is
/// `base_interval`, after the second `base_interval * multiplier`, and so on.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base_interval: Duration,
    multiplier: f64,
    max_delay: Duration,
    max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(base_interval: Duration, multiplier: f64, max_attempts: u32) -> Self {
        Self {
            base_interval,
            multiplier,
            max_delay: Duration::MAX,
            max_attempts,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_interval, config.multiplier, config.max_attempts)
            .with_max_delay(config.max_delay)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt_number: u32) -> Duration {
        let exponent = i32::try_from(attempt_number).unwrap_or(i32::MAX);
        let secs = self.base_interval.as_secs_f64() * self.multiplier.powi(exponent);
        // A negative multiplier flips the sign on odd attempts.
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        if secs.is_infinite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Decide what to do after attempt `attempt_number` failed with `error`.
    pub fn decide(&self, error: &ExternalError, attempt_number: u32) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Fatal;
        }
        if attempt_number.saturating_add(1) >= self.max_attempts {
            return RetryDecision::Fatal;
        }
        RetryDecision::Retry(self.delay_for(attempt_number))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}
