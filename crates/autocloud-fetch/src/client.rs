//! HTTP transport with Basic token authentication.

use async_trait::async_trait;
use autocloud_types::ApiError;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::request::{Payload, RequestOptions};
use crate::url::{self, DEFAULT_API_URL};

/// Configuration for the API client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Access token, sent as the Basic auth username with an empty password.
    pub token: String,
    /// Base URL of the API.
    pub api_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: format!("autocloud/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the default API URL.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Errors that can occur while building a client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No access token was configured.
    #[error("Token required")]
    MissingToken,

    /// The base URL could not be parsed.
    #[error("Invalid base URL {url:?}: {source}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parse failure.
        #[source]
        source: ::url::ParseError,
    },

    /// The HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Performs an authenticated API call.
///
/// Implementations resolve `path` against their base URL, fail with an
/// [`ApiError`] carrying `status` for non-2xx responses, and with a
/// status-less [`ApiError`] when the server could not be reached.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends one request.
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Payload, ApiError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `reqwest`-backed [`Transport`] with connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: ::url::Url,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the base URL is invalid, or
    /// the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.token.is_empty() {
            return Err(ClientError::MissingToken);
        }

        let base_url = url::canonical_base(&config.api_url).map_err(|source| ClientError::InvalidUrl {
            url: config.api_url.clone(),
            source,
        })?;

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the canonical base URL (always ending in `/`).
    #[must_use]
    pub const fn base_url(&self) -> &::url::Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Payload, ApiError> {
        let url = url::endpoint(&self.base_url, path)
            .map_err(|e| ApiError::network(format!("Invalid request path {path:?}: {e}")))?;

        debug!(method = %options.method, %url, "Sending API request");

        let query = options.present_query();
        let mut request = self.client.request(options.method.clone(), url);
        if !query.is_empty() {
            request = request.query(&query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.basic_auth(&self.config.token, None::<&str>);

        if let Some(body) = &options.body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| ApiError::UNEXPECTED_RESPONSE.to_string());
            debug!(status = status.as_u16(), %message, "API request failed");
            return Err(ApiError::http(status.as_u16(), message));
        }

        if !options.parse {
            return Ok(Payload::Raw(bytes));
        }

        serde_json::from_slice(&bytes)
            .map(Payload::Json)
            .map_err(|e| ApiError::network(format!("Invalid JSON response: {e}")))
    }
}
