//! API client over a [`Transport`].

use autocloud_types::{ApiError, JobEvent};
use serde::Deserialize;
use std::sync::Arc;

use crate::client::{ClientConfig, ClientError, HttpTransport, Transport};
use crate::request::{Payload, RequestOptions};
use crate::url::events_path;

/// Page of job events as returned by `GET jobs/{id}/events`.
#[derive(Deserialize)]
struct EventPage {
    data: Vec<JobEvent>,
}

/// API client sharing one transport between clones.
#[derive(Debug)]
pub struct ApiClient<T = HttpTransport> {
    transport: Arc<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl ApiClient<HttpTransport> {
    /// Creates a client backed by an [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends an arbitrary request.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn raw(&self, path: &str, options: RequestOptions) -> Result<Payload, ApiError> {
        self.transport.request(path, options).await
    }

    /// Fetches the job events recorded after the first `offset` events.
    ///
    /// Events are returned in server order, which is not guaranteed to be
    /// sorted by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an event page.
    pub async fn job_events(&self, job_id: &str, offset: u64) -> Result<Vec<JobEvent>, ApiError> {
        let options = RequestOptions::get().query("offset", offset);
        let page: EventPage = self
            .transport
            .request(&events_path(job_id), options)
            .await?
            .into_json()?;
        Ok(page.data)
    }
}
