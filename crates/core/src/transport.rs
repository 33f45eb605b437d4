// crates/core/src/transport.rs
//! Transport contract consumed by the tracked factory
//!
//! The engine never talks HTTP directly; it calls the four verbs of a
//! [`Transport`] and interprets the [`HttpResponse`] or [`TransportError`].

use crate::headers::Headers;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// HTTP verbs issued by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A successful (2xx or 304) response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers, lowercased
    pub headers: Headers,
    /// Parsed JSON body, if the response carried one
    pub body: Option<Value>,
}

impl HttpResponse {
    /// Creates a response without a body
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: None,
        }
    }

    /// Sets the JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns true for `304 Not Modified`
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// How a transport failure affects the resource it was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// 403
    Forbidden,
    /// 404, read as a tombstone
    Gone,
    /// Any other 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// No structured response (connection refused, DNS, malformed body)
    Unclassified,
}

/// A failed request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    /// HTTP status, if the server answered at all
    pub status: Option<u16>,
    pub message: String,
    /// Response headers, if any
    pub headers: Headers,
}

impl TransportError {
    /// Creates an error for a non-success HTTP status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            headers: Headers::new(),
        }
    }

    /// Creates an error for a failure without an HTTP response
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            headers: Headers::new(),
        }
    }

    /// Attaches response headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Classifies the failure by status
    pub fn kind(&self) -> TransportErrorKind {
        match self.status {
            Some(403) => TransportErrorKind::Forbidden,
            Some(404) => TransportErrorKind::Gone,
            Some(400..=499) => TransportErrorKind::ClientError,
            Some(500..=599) => TransportErrorKind::ServerError,
            _ => TransportErrorKind::Unclassified,
        }
    }

    /// Returns true if retrying could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            TransportErrorKind::ServerError | TransportErrorKind::Unclassified
        )
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "Transport failure: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outcome of one transport call
pub type TransportResult = Result<HttpResponse, TransportError>;

/// The four HTTP verbs the engine needs
///
/// Implementations return `Ok` for 2xx and `304`, and `Err` with the status
/// for everything else.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches a representation, sending the given request headers
    async fn get(&self, uri: &str, headers: &Headers) -> TransportResult;

    /// Replaces a representation
    async fn put(&self, uri: &str, body: &Value) -> TransportResult;

    /// Creates a resource in a collection
    async fn post(&self, uri: &str, body: &Value) -> TransportResult;

    /// Deletes a resource; `body` scopes the delete when present
    async fn delete(&self, uri: &str, body: Option<&Value>) -> TransportResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(TransportError::http(403, "no").kind(), TransportErrorKind::Forbidden);
        assert_eq!(TransportError::http(404, "gone").kind(), TransportErrorKind::Gone);
        assert_eq!(TransportError::http(400, "bad").kind(), TransportErrorKind::ClientError);
        assert_eq!(TransportError::http(503, "down").kind(), TransportErrorKind::ServerError);
        assert_eq!(
            TransportError::unclassified("refused").kind(),
            TransportErrorKind::Unclassified
        );
    }

    #[test]
    fn test_retryable() {
        assert!(TransportError::http(502, "bad gateway").is_retryable());
        assert!(TransportError::unclassified("reset").is_retryable());
        assert!(!TransportError::http(404, "gone").is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TransportError::http(500, "boom").to_string(), "HTTP 500: boom");
        assert_eq!(
            TransportError::unclassified("refused").to_string(),
            "Transport failure: refused"
        );
    }

    #[test]
    fn test_response_builder() {
        let response = HttpResponse::new(201).with_header("Location", "/a/1");
        assert_eq!(response.headers.location(), Some("/a/1"));
        assert!(!response.is_not_modified());
        assert!(HttpResponse::new(304).is_not_modified());
    }
}
