// crates/network/src/error.rs
//! Error types for network operations

use semnet_core::TransportError;
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during network operations
#[derive(Debug, Error)]
pub enum NetworkError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body was not valid JSON
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl NetworkError {
    /// Returns true if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Timeout => true,
            NetworkError::Http(e) => e.status().map_or(true, |s| s.is_server_error()),
            _ => false,
        }
    }

    /// Returns true if the error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        if let NetworkError::Http(e) = self {
            if let Some(status) = e.status() {
                return status.is_client_error();
            }
        }
        false
    }

    /// Returns true if the error is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        if let NetworkError::Http(e) = self {
            if let Some(status) = e.status() {
                return status.is_server_error();
            }
        }
        false
    }
}

impl From<NetworkError> for TransportError {
    fn from(err: NetworkError) -> Self {
        match &err {
            NetworkError::Http(e) if e.is_timeout() => {
                TransportError::unclassified(NetworkError::Timeout.to_string())
            }
            NetworkError::Http(e) => match e.status() {
                Some(status) => TransportError::http(status.as_u16(), err.to_string()),
                None => TransportError::unclassified(err.to_string()),
            },
            _ => TransportError::unclassified(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semnet_core::TransportErrorKind;

    #[test]
    fn test_error_display() {
        let err = NetworkError::InvalidUrl("test".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_invalid_body_error() {
        let err = NetworkError::InvalidBody("expected value".to_string());
        assert!(err.to_string().contains("Invalid response body"));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(NetworkError::Timeout.is_retryable());
        assert!(!NetworkError::InvalidUrl("test".to_string()).is_retryable());
        assert!(!NetworkError::InvalidBody("test".to_string()).is_retryable());
    }

    #[test]
    fn test_converts_to_unclassified_transport_error() {
        let err: TransportError = NetworkError::InvalidBody("eof".to_string()).into();
        assert_eq!(err.kind(), TransportErrorKind::Unclassified);
        assert!(err.message.contains("eof"));

        let err: TransportError = NetworkError::Timeout.into();
        assert_eq!(err.status, None);
    }
}
