//! Entry point wiring the transport, API client and job tracker together.

use autocloud_fetch::{ApiClient, ClientConfig, ClientError, Payload, RequestOptions};
use autocloud_track::{
    EventSink, JobTracker, SseChannel, SseConfig, Strategy, Tracking, TrackerConfig,
};
use autocloud_types::{ApiError, JobEvent, JobId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for [`Sdk`].
#[derive(Debug, Clone, Default)]
pub struct SdkConfig {
    /// HTTP transport settings.
    pub client: ClientConfig,
    /// Strategy selection settings.
    pub tracker: TrackerConfig,
    /// Push channel settings.
    pub sse: SseConfig,
}

impl SdkConfig {
    /// Creates a configuration with the given token and defaults elsewhere.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: ClientConfig::new(token),
            ..Self::default()
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.client = self.client.with_api_url(api_url);
        self
    }

    /// Prefers the server-sent events channel over polling.
    #[must_use]
    pub fn with_push(mut self, use_push: bool) -> Self {
        self.tracker.use_push = use_push;
        self
    }

    /// Sets the base poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.tracker.poll_interval = interval;
        self
    }
}

/// Client for the job API.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Sdk {
    api: ApiClient,
    tracker: JobTracker,
}

impl Sdk {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the API URL is invalid, or an
    /// HTTP client cannot be created.
    pub fn new(config: SdkConfig) -> Result<Self, ClientError> {
        let SdkConfig {
            client,
            tracker,
            sse,
        } = config;

        let push = SseChannel::new(&client, sse)?;
        let api = ApiClient::from_config(client)?;
        let tracker = JobTracker::new(Arc::new(api.clone()), tracker).with_push_channel(Arc::new(push));
        debug!(strategy = %tracker.strategy(), "Created API client");

        Ok(Self { api, tracker })
    }

    /// Returns the API client.
    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Returns the job tracker.
    #[must_use]
    pub const fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Returns the strategy new tracking sessions will use.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.tracker.strategy()
    }

    /// Starts tracking `job_id`, delivering events to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn track_job(&self, job_id: impl Into<JobId>, sink: impl EventSink) -> Tracking {
        self.tracker.track(job_id, sink)
    }

    /// Fetches one page of events for `job_id`, skipping the first `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn job_events(&self, job_id: &str, offset: u64) -> Result<Vec<JobEvent>, ApiError> {
        self.api.job_events(job_id, offset).await
    }

    /// Sends an arbitrary authenticated request.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn raw(&self, path: &str, options: RequestOptions) -> Result<Payload, ApiError> {
        self.api.raw(path, options).await
    }

    /// Binds this client to one job.
    #[must_use]
    pub fn job(&self, job_id: impl Into<JobId>) -> JobBinding {
        JobBinding {
            sdk: self.clone(),
            id: job_id.into(),
        }
    }
}

/// An [`Sdk`] bound to a single job.
#[derive(Debug, Clone)]
pub struct JobBinding {
    sdk: Sdk,
    id: JobId,
}

impl JobBinding {
    /// The bound job.
    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    /// Fetches one page of this job's events, skipping the first `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn events(&self, offset: u64) -> Result<Vec<JobEvent>, ApiError> {
        self.sdk.job_events(self.id.as_str(), offset).await
    }

    /// Starts tracking this job.
    pub fn track(&self, sink: impl EventSink) -> Tracking {
        self.sdk.track_job(self.id.clone(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocloud_track::event_channel;
    use autocloud_types::TrackEvent;
    use mockito::Matcher;

    // base64("tok:")
    const AUTH: &str = "Basic dG9rOg==";

    fn sdk(url: &str) -> Sdk {
        Sdk::new(
            SdkConfig::new("tok")
                .with_api_url(url)
                .with_poll_interval(Duration::from_millis(10)),
        )
        .unwrap()
    }

    #[test]
    fn test_config_builders() {
        let config = SdkConfig::new("tok")
            .with_api_url("https://api.example.com")
            .with_push(true)
            .with_poll_interval(Duration::from_millis(50));

        assert_eq!(config.client.token, "tok");
        assert_eq!(config.client.api_url, "https://api.example.com");
        assert!(config.tracker.use_push);
        assert_eq!(config.tracker.poll_interval, Duration::from_millis(50));
        assert_eq!(config.sse, SseConfig::default());
    }

    #[test]
    fn test_requires_token() {
        assert!(matches!(
            Sdk::new(SdkConfig::default()),
            Err(ClientError::MissingToken)
        ));
    }

    #[test]
    fn test_strategy_follows_config() {
        let polling = Sdk::new(SdkConfig::new("tok")).unwrap();
        assert_eq!(polling.strategy(), Strategy::Poll);

        let pushing = Sdk::new(SdkConfig::new("tok").with_push(true)).unwrap();
        assert_eq!(pushing.strategy(), Strategy::Push);
    }

    #[tokio::test]
    async fn test_job_binding_fetches_events() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs/j1/events")
            .match_header("authorization", AUTH)
            .match_query(Matcher::UrlEncoded("offset".into(), "4".into()))
            .with_status(200)
            .with_body(r#"{"data":[{"object":"job-event","name":"processing","createdAt":7}]}"#)
            .create_async()
            .await;

        let job = sdk(&server.url()).job("j1");
        let events = job.events(4).await.unwrap();

        assert_eq!(job.id().as_str(), "j1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "processing");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_track_job_polls_until_success() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/jobs/j1/events")
            .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
            .with_status(200)
            .with_body(r#"{"data":[{"object":"job-event","name":"processing","createdAt":1}]}"#)
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/jobs/j1/events")
            .match_query(Matcher::UrlEncoded("offset".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"data":[{"object":"job-event","name":"success","createdAt":2}]}"#)
            .create_async()
            .await;
        let (sink, mut rx) = event_channel();

        let session = sdk(&server.url())
            .job("j1")
            .track(sink)
            .finished()
            .await
            .unwrap();

        let mut names = Vec::new();
        while let Some(event) = rx.recv().await {
            names.push(event.name().to_string());
        }
        assert_eq!(names, vec!["processing", "success", "close"]);
        assert_eq!(session.offset(), 2);
        assert_eq!(session.strategy(), Strategy::Poll);
    }

    #[tokio::test]
    async fn test_track_job_reports_missing_job() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs/missing/events")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Job not found"}"#)
            .create_async()
            .await;
        let (sink, mut rx) = event_channel();

        sdk(&server.url())
            .track_job("missing", sink)
            .finished()
            .await
            .unwrap();

        match rx.recv().await {
            Some(TrackEvent::Error(err)) => assert_eq!(err.status(), Some(404)),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(TrackEvent::Close)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_raw_get() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/services")
            .match_header("authorization", AUTH)
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let payload = sdk(&server.url())
            .raw("services", RequestOptions::get())
            .await
            .unwrap();

        let value: serde_json::Value = payload.into_json().unwrap();
        assert_eq!(value, serde_json::json!({"data": []}));
        mock.assert_async().await;
    }
}
