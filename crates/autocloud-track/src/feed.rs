//! Source of job events for the poll loop.

use async_trait::async_trait;
use autocloud_fetch::{ApiClient, Transport};
use autocloud_types::{ApiError, JobEvent};
use std::fmt;

/// Fetches pages of a job's event log.
#[async_trait]
pub trait JobEventFeed: Send + Sync + fmt::Debug + 'static {
    /// Returns the events recorded after the first `offset` events.
    async fn job_events(&self, job_id: &str, offset: u64) -> Result<Vec<JobEvent>, ApiError>;
}

#[async_trait]
impl<T: Transport + 'static> JobEventFeed for ApiClient<T> {
    async fn job_events(&self, job_id: &str, offset: u64) -> Result<Vec<JobEvent>, ApiError> {
        Self::job_events(self, job_id, offset).await
    }
}
