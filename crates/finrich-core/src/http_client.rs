//! Transport seam between the pipeline and the network.
//!
//! Every upstream read in finrich is a GET that returns a text body, so the
//! envelope types only model that. [`ReqwestHttpClient`] is the production
//! transport; tests substitute a scripted [`HttpClient`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Credential attached to provider requests.
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    BearerToken(String),
}

impl HttpAuth {
    fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Self::None => None,
            Self::BearerToken(token) => Some(("authorization", format!("Bearer {token}"))),
        }
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

/// One GET request. Header names are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(self, auth: &HttpAuth) -> Self {
        match auth.header() {
            Some((name, value)) => self.with_header(name, value),
            None => self,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP status level: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Timeouts, refused connections, truncated bodies.
    #[error("{0}")]
    Transient(String),
    /// The request itself could not be built.
    #[error("{0}")]
    Fatal(String),
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Fatal(message) => message,
        }
    }

    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Self::Fatal(format!("invalid request: {error}"))
        } else if error.is_timeout() {
            Self::Transient(format!("request timed out: {error}"))
        } else if error.is_connect() {
            Self::Transient(format!("connection failed: {error}"))
        } else if error.is_body() || error.is_decode() {
            Self::Transient(format!("failed to read response body: {error}"))
        } else {
            Self::Transient(format!("request failed: {error}"))
        }
    }
}

pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("finrich/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let HttpRequest {
                url,
                headers,
                timeout,
            } = request;

            let response = headers
                .iter()
                .fold(self.client.get(&url), |builder, (name, value)| {
                    builder.header(name.as_str(), value.as_str())
                })
                .timeout(timeout)
                .send()
                .await?;

            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}
