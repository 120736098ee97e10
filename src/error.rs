//! Error types shared across the library.
//!
//! Analytics errors are recoverable: the renderer turns each one into an
//! empty or neutral state. Fetch errors block the whole dashboard until a
//! retry succeeds.

use crate::client::Endpoint;
use thiserror::Error;

/// Failures of the pure computations (normalizer, selector).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("no timeline data")]
    EmptyInput,

    #[error("at least two timeline points are needed")]
    InsufficientHistory,

    #[error("portfolio has no holdings")]
    EmptyPortfolio,

    #[error("no capital invested; percentage is undefined")]
    NoInvestment,

    #[error("portfolio value is zero; allocation is undefined")]
    ZeroPortfolioValue,
}

/// A single backend call failing. Any one of these fails the whole refresh.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL for {endpoint}: {source}")]
    Url {
        endpoint: Endpoint,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: Endpoint,
        status: reqwest::StatusCode,
    },

    #[error("{endpoint} returned malformed JSON: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Url { endpoint, .. }
            | FetchError::Transport { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Decode { endpoint, .. } => *endpoint,
        }
    }

    /// Transport failures, 5xx and 429 may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Url { .. } | FetchError::Decode { .. } => false,
        }
    }
}

/// Unknown column / field name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field '{0}'")]
pub struct ParseFieldError(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_retry_policy() {
        let err = |status| FetchError::Status { endpoint: Endpoint::Holdings, status };
        assert!(err(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(err(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(err(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!err(StatusCode::NOT_FOUND).is_retryable());
    }

    #[test]
    fn test_error_names_endpoint() {
        let err = FetchError::Status {
            endpoint: Endpoint::MarketCap,
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.endpoint(), Endpoint::MarketCap);
        assert!(err.to_string().contains("/api/portfolio/marketcap"));
    }
}
