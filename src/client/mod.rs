//! Outbound side: throttled, retrying calls against a third-party API and a
//! sequential batch driver on top of them.

pub mod backoff;
pub mod batch;
pub mod rate_limiter;
pub mod resilient;

pub use backoff::{BackoffPolicy, RetryDecision};
pub use batch::{BatchExecutor, BatchResult};
pub use rate_limiter::RateLimiter;
pub use resilient::{ResilientClient, RetryAttempt};
