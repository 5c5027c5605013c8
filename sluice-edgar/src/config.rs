use sluice::{ClientConfig, Result, SluiceError};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.sec-api.io";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EdgarConfig {
    pub api_key: String,
    pub base_url: String,
    /// Per-request timeout; a timed-out request counts as a network failure.
    pub timeout: Duration,
    pub client: ClientConfig,
}

impl EdgarConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: ClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Reads `SEC_API_KEY` (required), `SLUICE_EDGAR_BASE_URL`,
    /// `SLUICE_EDGAR_TIMEOUT_SECS` and the `SLUICE_*` client settings.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SEC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SluiceError::Config("SEC_API_KEY environment variable is required".to_string())
            })?;

        let base_url = std::env::var("SLUICE_EDGAR_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = match std::env::var("SLUICE_EDGAR_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                SluiceError::Config(format!("SLUICE_EDGAR_TIMEOUT_SECS: invalid value {:?}", raw))
            })?,
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            api_key,
            base_url,
            timeout,
            client: ClientConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SluiceError::Config("SEC API key must not be empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SluiceError::Config(format!(
                "EDGAR base URL must be http(s): {}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(SluiceError::Config("EDGAR timeout must be > 0".into()));
        }
        self.client.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "SEC_API_KEY",
            "SLUICE_EDGAR_BASE_URL",
            "SLUICE_EDGAR_TIMEOUT_SECS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_missing_api_key() {
        clear_env();
        let err = EdgarConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("SEC_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_defaults_from_env() {
        clear_env();
        std::env::set_var("SEC_API_KEY", "abc123");
        let config = EdgarConfig::from_env().unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides_and_bad_timeout() {
        clear_env();
        std::env::set_var("SEC_API_KEY", "abc123");
        std::env::set_var("SLUICE_EDGAR_BASE_URL", "http://127.0.0.1:9000");
        std::env::set_var("SLUICE_EDGAR_TIMEOUT_SECS", "3");
        let config = EdgarConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(3));

        std::env::set_var("SLUICE_EDGAR_TIMEOUT_SECS", "soon");
        assert!(EdgarConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = EdgarConfig::new("k").with_base_url("ftp://sec.gov");
        assert!(config.validate().is_err());
    }
}
