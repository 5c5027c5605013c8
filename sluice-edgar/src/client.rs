use crate::config::EdgarConfig;
use crate::types::{CompanyData, MappingRecord};
use sluice::{
    BatchExecutor, BatchResult, ExternalError, FatalError, ResilientClient, Result, SluiceError,
};

/// sec-api.io mapping client. Every request goes through one shared rate
/// limiter and retry policy; clones share both.
#[derive(Clone)]
pub struct EdgarClient {
    config: EdgarConfig,
    http_client: reqwest::Client,
    resilient: ResilientClient,
    batch: BatchExecutor,
}

impl EdgarClient {
    pub fn new(config: EdgarConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SluiceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            resilient: ResilientClient::from_config(&config.client),
            batch: BatchExecutor::from_config("EDGAR", &config.client),
            http_client,
            config,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(EdgarConfig::from_env()?)
    }

    pub fn config(&self) -> &EdgarConfig {
        &self.config
    }

    /// Look up one ticker, retrying transient failures. A ticker the API
    /// knows nothing about yields [`CompanyData::placeholder`].
    pub async fn company_by_ticker(
        &self,
        ticker: &str,
    ) -> std::result::Result<CompanyData, FatalError> {
        self.resilient.execute(|| self.fetch_mapping(ticker)).await
    }

    /// Fetch every ticker in order. Failures land in `failed()` and do not
    /// stop the batch.
    pub async fn fetch_companies(&self, tickers: &[String]) -> BatchResult<CompanyData, String> {
        self.batch
            .run_batch(tickers, |ticker| async move {
                self.company_by_ticker(&ticker).await
            })
            .await
    }

    async fn fetch_mapping(
        &self,
        ticker: &str,
    ) -> std::result::Result<CompanyData, ExternalError> {
        let ticker = ticker.trim().to_uppercase();
        let url = format!(
            "{}/mapping/ticker/{}",
            self.config.base_url.trim_end_matches('/'),
            ticker
        );
        tracing::debug!("[EDGAR] GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("token", self.config.api_key.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExternalError::Network(format!("request for {} failed: {}", ticker, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExternalError::http(
                status,
                format!("SEC API request for {} failed", ticker),
            ));
        }

        let records: Vec<MappingRecord> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ExternalError::Network(format!("reading response for {} timed out: {}", ticker, e))
            } else {
                ExternalError::Other(format!("failed to parse response for {}: {}", ticker, e))
            }
        })?;

        match records.into_iter().next() {
            Some(record) => Ok(CompanyData::from_record(&ticker, record)),
            None => {
                tracing::warn!("[EDGAR] no company data found for {}", ticker);
                Ok(CompanyData::placeholder(&ticker))
            }
        }
    }
}
