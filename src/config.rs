use crate::error::{Result, SluiceError};
use crate::queue::store::is_valid_key;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_QUEUE_KEY: &str = "offline_queue";

/// Settings for calls against one external endpoint family.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Minimum spacing between the start of two requests.
    pub min_interval: Duration,
    /// Upper bound on underlying calls for one logical request.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_interval: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
    /// Ceiling for a single backoff delay.
    pub max_delay: Duration,
    /// Extra pause inserted by the batch executor after an item is abandoned
    /// while the service was still answering 429.
    pub rate_limit_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(100),
            max_attempts: 3,
            base_interval: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_millis(1000),
        }
    }
}

impl ClientConfig {
    /// Load from `SLUICE_*` environment variables, falling back to defaults
    /// for anything unset. A set but unparseable variable is an error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            min_interval: env_millis("SLUICE_MIN_INTERVAL_MS")?.unwrap_or(defaults.min_interval),
            max_attempts: env_parse("SLUICE_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            base_interval: env_millis("SLUICE_BACKOFF_BASE_MS")?
                .unwrap_or(defaults.base_interval),
            multiplier: env_parse("SLUICE_BACKOFF_MULTIPLIER")?.unwrap_or(defaults.multiplier),
            max_delay: env_millis("SLUICE_BACKOFF_MAX_MS")?.unwrap_or(defaults.max_delay),
            rate_limit_cooldown: env_millis("SLUICE_RATE_LIMIT_COOLDOWN_MS")?
                .unwrap_or(defaults.rate_limit_cooldown),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SluiceError::Config("max_attempts must be at least 1".into()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SluiceError::Config(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_delay < self.base_interval {
            return Err(SluiceError::Config(format!(
                "max_delay ({:?}) is shorter than base_interval ({:?})",
                self.max_delay, self.base_interval
            )));
        }
        Ok(())
    }
}

/// Settings for the offline mutation queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Failed attempts after which a queued operation is dropped.
    pub max_retries: u32,
    /// Optional cap on how many operations one drain pass snapshots.
    pub max_drain_batch: Option<usize>,
    /// Key the queue snapshot is stored under.
    pub storage_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_drain_batch: None,
            storage_key: DEFAULT_QUEUE_KEY.to_string(),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_retries: env_parse("SLUICE_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            max_drain_batch: env_parse("SLUICE_MAX_DRAIN_BATCH")?,
            storage_key: env::var("SLUICE_QUEUE_KEY").unwrap_or(defaults.storage_key),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(SluiceError::Config("max_retries must be at least 1".into()));
        }
        if self.max_drain_batch == Some(0) {
            return Err(SluiceError::Config(
                "max_drain_batch must be at least 1 when set".into(),
            ));
        }
        if !is_valid_key(&self.storage_key) {
            return Err(SluiceError::Config(format!(
                "storage_key must be non-empty ASCII letters, digits, '_', '-' or '.', got {:?}",
                self.storage_key
            )));
        }
        Ok(())
    }
}

/// Everything a [`crate::SyncManager`] needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncConfig {
    pub client: ClientConfig,
    pub queue: QueueConfig,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client: ClientConfig::from_env()?,
            queue: QueueConfig::from_env()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.queue.validate()
    }
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| SluiceError::Config(format!("Invalid {}: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn env_millis(name: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(name)?.map(Duration::from_millis))
}
