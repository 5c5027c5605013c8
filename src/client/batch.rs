use crate::config::ClientConfig;
use crate::error::FatalError;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Outcome of one batch run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult<T, K> {
    succeeded: Vec<T>,
    failed: Vec<K>,
}

impl<T, K> BatchResult<T, K> {
    pub fn succeeded(&self) -> &[T] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[K] {
        &self.failed
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<K>) {
        (self.succeeded, self.failed)
    }
}

/// Runs independent fetches one after another, isolating per-item failures.
///
/// Items are never dispatched concurrently; the rate limiter behind
/// `fetch_one` already serializes the channel.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    label: String,
    rate_limit_cooldown: Duration,
}

impl BatchExecutor {
    pub fn new(label: impl Into<String>, rate_limit_cooldown: Duration) -> Self {
        Self {
            label: label.into(),
            rate_limit_cooldown,
        }
    }

    pub fn from_config(label: impl Into<String>, config: &ClientConfig) -> Self {
        Self::new(label, config.rate_limit_cooldown)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        self.rate_limit_cooldown
    }

    pub async fn run_batch<K, T, F, Fut>(&self, items: &[K], mut fetch_one: F) -> BatchResult<T, K>
    where
        K: Clone + Display,
        F: FnMut(K) -> Fut,
        Fut: Future<Output = Result<T, FatalError>>,
    {
        let total = items.len();
        let mut succeeded = Vec::with_capacity(total);
        let mut failed = Vec::new();

        if total == 0 {
            tracing::debug!("[BATCH {}] nothing to fetch", self.label);
            return BatchResult { succeeded, failed };
        }

        tracing::info!("[BATCH {}] fetching {} items", self.label, total);

        for (i, item) in items.iter().enumerate() {
            tracing::debug!("[BATCH {}] {}/{}: {}", self.label, i + 1, total, item);

            match fetch_one(item.clone()).await {
                Ok(value) => succeeded.push(value),
                Err(e) => {
                    tracing::warn!("[BATCH {}] {} failed: {}", self.label, item, e);
                    failed.push(item.clone());

                    let has_next = i + 1 < total;
                    if e.is_rate_limited() && has_next && !self.rate_limit_cooldown.is_zero() {
                        tracing::warn!(
                            "[BATCH {}] still rate limited, cooling down {}ms",
                            self.label,
                            self.rate_limit_cooldown.as_millis()
                        );
                        tokio::time::sleep(self.rate_limit_cooldown).await;
                    }
                }
            }
        }

        tracing::info!(
            "[BATCH {}] succeeded {}/{}",
            self.label,
            succeeded.len(),
            total
        );

        BatchResult { succeeded, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExternalError;
    use http::StatusCode;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn fatal(status: StatusCode) -> FatalError {
        FatalError {
            attempts: 3,
            cause: ExternalError::http(status, "failed"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_is_noop() {
        let executor = BatchExecutor::new("test", Duration::from_millis(500));
        let result: BatchResult<u32, String> = executor
            .run_batch(&[], |_k: String| async { Ok(1) })
            .await;
        assert_eq!(result.total(), 0);
        assert!(result.is_complete_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_isolated_and_order_kept() {
        let executor = BatchExecutor::new("test", Duration::ZERO);
        let seen = Mutex::new(Vec::new());
        let items: Vec<u32> = (1..=6).collect();

        let result = executor
            .run_batch(&items, |n| {
                seen.lock().unwrap().push(n);
                async move {
                    if n % 3 == 0 {
                        Err(fatal(StatusCode::NOT_FOUND))
                    } else {
                        Ok(n * 10)
                    }
                }
            })
            .await;

        assert_eq!(*seen.lock().unwrap(), items);
        assert_eq!(result.succeeded(), &[10, 20, 40, 50]);
        assert_eq!(result.failed(), &[3, 6]);
        assert_eq!(result.total(), items.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_after_rate_limited_item() {
        let executor = BatchExecutor::new("test", Duration::from_millis(500));
        let items = vec!["a", "b", "c"];
        let start = Instant::now();

        let result = executor
            .run_batch(&items, |k| async move {
                if k == "b" {
                    Err(fatal(StatusCode::TOO_MANY_REQUESTS))
                } else {
                    Ok(k.to_uppercase())
                }
            })
            .await;

        assert_eq!(result.failed(), &["b"]);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_cooldown_for_other_failures_or_last_item() {
        let executor = BatchExecutor::new("test", Duration::from_millis(500));
        let items = vec!["a", "b"];
        let start = Instant::now();

        let result = executor
            .run_batch(&items, |k| async move {
                match k {
                    "a" => Err(fatal(StatusCode::FORBIDDEN)),
                    _ => Err::<String, _>(fatal(StatusCode::TOO_MANY_REQUESTS)),
                }
            })
            .await;

        assert_eq!(result.failed(), &["a", "b"]);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
