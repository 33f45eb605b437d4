// crates/network/src/client.rs
//! HTTP transport over reqwest

use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response, StatusCode, Url};
use semnet_config::TransportConfig;
use semnet_core::headers::LOCATION;
use semnet_core::{Headers, HttpResponse, Method, Transport, TransportError, TransportResult};
use semnet_resilience::{with_retry, RetryPolicy};
use serde_json::Value;
use std::time::Duration;

const JSON: &str = "application/json";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Retry policy for reads; writes are never retried
    pub retry_policy: Option<RetryPolicy>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("semnet/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            retry_policy: Some(RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100))),
        }
    }
}

impl From<&TransportConfig> for ClientConfig {
    fn from(config: &TransportConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            max_redirects: config.max_redirects,
            retry_policy: Some(
                RetryPolicy::new(config.retry_attempts)
                    .with_initial_delay(Duration::from_millis(config.retry_initial_delay_ms)),
            ),
        }
    }
}

/// JSON hypermedia transport
///
/// Successful (2xx) and `304 Not Modified` responses come back as
/// [`HttpResponse`]; every other status becomes a [`TransportError`] that
/// carries the status code. GETs are retried under the configured policy
/// when the failure is a 5xx or has no status at all.
#[derive(Clone)]
pub struct HttpTransport {
    inner: ReqwestClient,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a new transport with default configuration
    pub fn new() -> NetworkResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a new transport with custom configuration
    pub fn with_config(config: ClientConfig) -> NetworkResult<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Creates a transport from the `[transport]` config section
    pub fn from_config(config: &TransportConfig) -> NetworkResult<Self> {
        Self::with_config(ClientConfig::from(config))
    }

    /// Gets the active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn execute(
        &self,
        method: Method,
        uri: &str,
        headers: Option<&Headers>,
        body: Option<&Value>,
    ) -> TransportResult {
        let url = Url::parse(uri).map_err(|e| NetworkError::InvalidUrl(format!("{uri}: {e}")))?;

        let mut request = self
            .inner
            .request(to_reqwest_method(method), url)
            .header(reqwest::header::ACCEPT, JSON);
        if let Some(headers) = headers {
            for (name, value) in headers.iter() {
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        log::debug!("{} {}", method, uri);
        let response = request.send().await.map_err(NetworkError::from)?;
        into_result(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, uri: &str, headers: &Headers) -> TransportResult {
        let policy = self
            .config
            .retry_policy
            .clone()
            .unwrap_or_else(RetryPolicy::no_retry);

        with_retry(&policy, TransportError::is_retryable, || {
            self.execute(Method::Get, uri, Some(headers), None)
        })
        .await
    }

    async fn put(&self, uri: &str, body: &Value) -> TransportResult {
        self.execute(Method::Put, uri, None, Some(body)).await
    }

    async fn post(&self, uri: &str, body: &Value) -> TransportResult {
        self.execute(Method::Post, uri, None, Some(body)).await
    }

    async fn delete(&self, uri: &str, body: Option<&Value>) -> TransportResult {
        self.execute(Method::Delete, uri, None, body).await
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

async fn into_result(response: Response) -> TransportResult {
    let status = response.status();
    let base = response.url().clone();

    let mut headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.to_string())))
        .collect();

    // Location is resolved against the final request URL
    if let Some(location) = headers.location().map(str::to_owned) {
        match base.join(&location) {
            Ok(absolute) => headers.insert(LOCATION, absolute.as_str()),
            Err(e) => log::warn!("Unresolvable Location header {}: {}", location, e),
        }
    }

    let bytes = response.bytes().await.map_err(NetworkError::from)?;

    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| NetworkError::InvalidBody(e.to_string()))?;
            Some(value)
        };
        return Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        });
    }

    let reason = status.canonical_reason().unwrap_or("Unknown");
    Err(TransportError::http(status.as_u16(), reason).with_headers(headers))
}
