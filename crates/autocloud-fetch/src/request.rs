//! Request options and response payloads.

use autocloud_types::ApiError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use reqwest::Method;

/// Options for a single API request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method. Defaults to `GET`.
    pub method: Method,
    /// Query parameters. Entries with a `None` value are omitted.
    pub query: Vec<(String, Option<String>)>,
    /// Extra headers. `Authorization` is always overwritten by the transport.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Whether to decode the response as JSON. Defaults to `true`.
    pub parse: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            parse: true,
        }
    }
}

impl RequestOptions {
    /// Options for a `GET` request.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Options for a `POST` request.
    #[must_use]
    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), Some(value.to_string())));
        self
    }

    /// Adds a query parameter that is skipped when `value` is `None`.
    #[must_use]
    pub fn query_opt(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        self.query.push((key.into(), value.map(|v| v.to_string())));
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the raw response bytes instead of decoding JSON.
    #[must_use]
    pub const fn raw(mut self) -> Self {
        self.parse = false;
        self
    }

    /// Returns the query parameters that carry a value.
    pub(crate) fn present_query(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
            .collect()
    }
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded JSON document.
    Json(Value),
    /// Undecoded response bytes (requests with `parse == false`).
    Raw(Bytes),
}

impl Payload {
    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns a status-less [`ApiError`] if the payload does not match `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let decoded = match self {
            Self::Json(value) => serde_json::from_value(value),
            Self::Raw(bytes) => serde_json::from_slice(&bytes),
        };
        decoded.map_err(|e| ApiError::network(format!("Invalid response body: {e}")))
    }

    /// Returns the payload as bytes, serializing JSON if needed.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Raw(bytes) => bytes,
        }
    }
}
