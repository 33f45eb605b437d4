// crates/resilience/src/error.rs
//! Error types for request scheduling

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors that can occur while scheduling or retrying requests
///
/// The type is `Clone` because a single in-flight outcome is handed to every
/// caller that was deduplicated onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// The request was aborted by `clear_all` before it completed
    #[error("Request was cancelled")]
    Cancelled,

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl ResilienceError {
    /// Returns true if the request never ran to completion because of cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_error() {
        let err = ResilienceError::Cancelled;
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_custom_error() {
        let err = ResilienceError::Custom("Lock poisoned".to_string());
        assert!(!err.is_cancelled());
        assert_eq!(err.to_string(), "Lock poisoned");
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = ResilienceError::Custom("boom".to_string());
        assert_eq!(err.clone(), err);
    }
}
