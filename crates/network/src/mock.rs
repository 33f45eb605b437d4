// crates/network/src/mock.rs
//! Scripted in-memory transport
//!
//! Responses are queued per `(method, uri)`. Each call pops the next queued
//! response; the last one is sticky and answers every later call. Calls with
//! no route get a `404`. Every call is recorded so tests can assert exactly
//! which requests the engine made.

use async_trait::async_trait;
use parking_lot::Mutex;
use semnet_core::{Headers, HttpResponse, Method, Transport, TransportError, TransportResult};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// One request seen by a [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub uri: String,
    /// Request headers (GET only)
    pub headers: Headers,
    pub body: Option<Value>,
}

/// In-memory [`Transport`] for tests
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<TransportResult>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Creates a transport with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response, which makes overlapping requests observable
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a response for `method uri`
    pub fn on(&self, method: Method, uri: &str, response: TransportResult) -> &Self {
        self.routes
            .lock()
            .entry((method, uri.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Queues a `200` JSON response for `GET uri`
    pub fn on_get(&self, uri: &str, body: Value) -> &Self {
        self.on(Method::Get, uri, Ok(HttpResponse::new(200).with_body(body)))
    }

    /// Queues a failure with `status` for `method uri`
    pub fn on_error(&self, method: Method, uri: &str, status: u16) -> &Self {
        self.on(method, uri, Err(TransportError::http(status, "scripted failure")))
    }

    /// Returns every recorded call in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the recorded calls for one verb
    pub fn calls_to(&self, method: Method) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    /// Counts calls to `method uri`
    pub fn count(&self, method: Method, uri: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.uri == uri)
            .count()
    }

    /// Counts all calls for one verb
    pub fn count_method(&self, method: Method) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }

    /// Forgets recorded calls, keeping the routes
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn respond(&self, call: RecordedCall) -> TransportResult {
        let key = (call.method, call.uri.clone());
        self.calls.lock().push(call);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = match self.routes.lock().get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        scripted.unwrap_or_else(|| {
            log::debug!("No scripted response for {} {}", key.0, key.1);
            Err(TransportError::http(404, "Not Found"))
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, uri: &str, headers: &Headers) -> TransportResult {
        self.respond(RecordedCall {
            method: Method::Get,
            uri: uri.to_string(),
            headers: headers.clone(),
            body: None,
        })
        .await
    }

    async fn put(&self, uri: &str, body: &Value) -> TransportResult {
        self.respond(RecordedCall {
            method: Method::Put,
            uri: uri.to_string(),
            headers: Headers::new(),
            body: Some(body.clone()),
        })
        .await
    }

    async fn post(&self, uri: &str, body: &Value) -> TransportResult {
        self.respond(RecordedCall {
            method: Method::Post,
            uri: uri.to_string(),
            headers: Headers::new(),
            body: Some(body.clone()),
        })
        .await
    }

    async fn delete(&self, uri: &str, body: Option<&Value>) -> TransportResult {
        self.respond(RecordedCall {
            method: Method::Delete,
            uri: uri.to_string(),
            headers: Headers::new(),
            body: body.cloned(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unrouted_call_is_not_found() {
        let transport = MockTransport::new();
        let err = transport
            .get("https://api.example.com/missing", &Headers::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(transport.count(Method::Get, "https://api.example.com/missing"), 1);
    }

    #[tokio::test]
    async fn test_queue_then_sticky_last_response() {
        let transport = MockTransport::new();
        transport
            .on_error(Method::Get, "https://api.example.com/a", 503)
            .on_get("https://api.example.com/a", json!({"links": []}));

        let uri = "https://api.example.com/a";
        assert!(transport.get(uri, &Headers::new()).await.is_err());
        assert!(transport.get(uri, &Headers::new()).await.is_ok());
        assert!(transport.get(uri, &Headers::new()).await.is_ok());
        assert_eq!(transport.count(Method::Get, uri), 3);
    }

    #[tokio::test]
    async fn test_records_bodies_and_headers() {
        let transport = MockTransport::new();
        let headers = Headers::new().with("If-None-Match", "\"v1\"");
        let _ = transport.get("https://api.example.com/a", &headers).await;
        let _ = transport
            .post("https://api.example.com/c", &json!({"name": "x"}))
            .await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].headers.get("if-none-match"), Some("\"v1\""));
        assert_eq!(calls[1].body, Some(json!({"name": "x"})));
        assert_eq!(transport.calls_to(Method::Post).len(), 1);

        transport.clear_calls();
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_routes_are_per_method() {
        let transport = MockTransport::new();
        transport.on(
            Method::Delete,
            "https://api.example.com/a",
            Ok(HttpResponse::new(204)),
        );
        assert!(transport
            .delete("https://api.example.com/a", None)
            .await
            .is_ok());
        assert!(transport
            .put("https://api.example.com/a", &json!({}))
            .await
            .is_err());
        assert_eq!(transport.count_method(Method::Delete), 1);
    }
}
