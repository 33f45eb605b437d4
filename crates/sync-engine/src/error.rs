// crates/sync-engine/src/error.rs
//! Error types for tracked resource and sync operations

use semnet_core::{CoreError, TransportError};
use semnet_resilience::ResilienceError;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while loading, writing or syncing resources
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller asked for something that can never work, such as an
    /// operation on a resource with no URI for the requested relation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A transport failure, only surfaced when a `throw_on_*_error` flag is set
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// The request was cancelled or the loader failed
    #[error("Request loader error: {0}")]
    Loader(#[from] ResilienceError),

    /// A representation could not be parsed or had the wrong shape
    #[error("Representation error: {0}")]
    Representation(#[from] CoreError),
}

impl EngineError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        EngineError::Configuration(message.into())
    }

    /// Returns true for programmer errors that are always raised
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }

    /// The transport failure, if this error carries one
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            EngineError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
