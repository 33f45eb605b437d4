// crates/core/src/error.rs
//! Error types for the resource model

use crate::resource::ResourceKind;
use thiserror::Error;

/// Result type for resource model operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building or reshaping resources
#[derive(Error, Debug)]
pub enum CoreError {
    /// A representation did not have the expected wire shape
    #[error("Invalid representation: {0}")]
    InvalidRepresentation(String),

    /// A resource was used as a different kind than it was created as
    #[error("Expected a {expected} resource, found a {found}")]
    KindMismatch {
        expected: ResourceKind,
        found: ResourceKind,
    },

    /// A resource had no link for the requested relation
    #[error("Resource has no '{rel}' link")]
    MissingLink { rel: String },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates an invalid representation error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRepresentation(reason.into())
    }

    /// Creates a missing link error
    pub fn missing_link(rel: impl Into<String>) -> Self {
        Self::MissingLink { rel: rel.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mismatch_display() {
        let err = CoreError::KindMismatch {
            expected: ResourceKind::Collection,
            found: ResourceKind::Singleton,
        };
        assert_eq!(
            err.to_string(),
            "Expected a collection resource, found a singleton"
        );
    }

    #[test]
    fn test_missing_link_display() {
        let err = CoreError::missing_link("edit-form");
        assert!(err.to_string().contains("edit-form"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Json(_)));
    }
}
