use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SluiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("External call failed: {0}")]
    External(#[from] ExternalError),

    #[error("Queue worker has shut down")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, SluiceError>;

impl From<std::io::Error> for SluiceError {
    fn from(e: std::io::Error) -> Self {
        SluiceError::Io(e.to_string())
    }
}

/// Failure of one call against an external system.
///
/// `Http` carries the response status so 429 and 5xx can be told apart from
/// other client errors when deciding whether to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalError {
    #[error("HTTP {status}: {message}")]
    Http { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

impl ExternalError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        ExternalError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ExternalError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// 429, 5xx, transport failures and anything uncategorized are worth
    /// another attempt; every other 4xx is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExternalError::Http { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || !status.is_client_error()
            }
            ExternalError::Network(_) => true,
            ExternalError::Other(_) => true,
        }
    }

    /// Short machine-readable label used in log lines and queue events.
    pub fn code(&self) -> &'static str {
        match self {
            ExternalError::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                "rate_limited"
            }
            ExternalError::Http { status, .. } if status.is_server_error() => "server_error",
            ExternalError::Http { .. } => "client_error",
            ExternalError::Network(_) => "network_error",
            ExternalError::Other(_) => "unknown_error",
        }
    }
}

/// Terminal outcome of a logical request after retries stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gave up after {attempts} attempt(s): {cause}")]
pub struct FatalError {
    pub attempts: u32,
    pub cause: ExternalError,
}

impl FatalError {
    pub fn is_rate_limited(&self) -> bool {
        self.cause.is_rate_limited()
    }
}
