use thiserror::Error;
use valuation_core::ValuationError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("No response from provider")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Snapshot(#[from] ValuationError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<ProviderError> for ValuationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Snapshot(inner) => inner,
            other => ValuationError::Provider(other.to_string()),
        }
    }
}
