use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum spacing between requests to one endpoint family.
///
/// Callers sharing an instance serialize through `acquire`. The spacing is
/// measured between the moments callers are released, so a slow request does
/// not push the next one further out.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may start, then record the start time.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if now < ready_at {
                tracing::debug!(
                    "[RATE] throttling for {}ms",
                    ready_at.saturating_duration_since(now).as_millis()
                );
                sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}
