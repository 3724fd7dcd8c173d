//! Server-sent events push channel.

use autocloud_fetch::url::{canonical_base, event_stream_url};
use autocloud_fetch::{ClientConfig, ClientError};
use autocloud_types::{JobId, TrackError};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::push::{MessageStream, PushChannel};

/// Configuration for the server-sent events channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SseConfig {
    /// Delay before reconnecting, until the server sends a `retry:` field.
    pub reconnect_delay: Duration,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// Push channel streaming `GET jobs/{id}/events` as `text/event-stream`.
///
/// The token travels as the URL's userinfo, which the HTTP stack sends as a
/// Basic credential. Behaves like a browser `EventSource`: dropped
/// connections are re-established after the reconnect delay with
/// `Last-Event-ID`, and a non-200 response closes the channel for good.
#[derive(Clone)]
pub struct SseChannel {
    client: Client,
    base_url: Url,
    token: String,
    config: SseConfig,
}

impl fmt::Debug for SseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseChannel")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SseChannel {
    /// Creates a channel for the API described by `client_config`.
    ///
    /// The request timeout of `client_config` is not applied, since the
    /// connection stays open for the lifetime of the job.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty, the base URL is invalid, or
    /// the HTTP client cannot be created.
    pub fn new(client_config: &ClientConfig, config: SseConfig) -> Result<Self, ClientError> {
        if client_config.token.is_empty() {
            return Err(ClientError::MissingToken);
        }

        let base_url =
            canonical_base(&client_config.api_url).map_err(|source| ClientError::InvalidUrl {
                url: client_config.api_url.clone(),
                source,
            })?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(&client_config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: client_config.token.clone(),
            config,
        })
    }

    /// Returns the channel configuration.
    #[must_use]
    pub const fn config(&self) -> &SseConfig {
        &self.config
    }

    fn connection(&self, url: Url, job_id: &JobId) -> Connection {
        Connection {
            client: self.client.clone(),
            url,
            job_id: job_id.clone(),
            retry: self.config.reconnect_delay,
            last_event_id: None,
            phase: Phase::Connect { delay: None },
        }
    }
}

impl PushChannel for SseChannel {
    fn open(&self, job_id: &JobId) -> MessageStream {
        match event_stream_url(&self.base_url, &self.token, job_id.as_str()) {
            Ok(url) => stream::unfold(self.connection(url, job_id), next_message).boxed(),
            Err(e) => {
                let error = TrackError::Channel(format!("Invalid push channel URL: {e}"));
                stream::once(async move { Err(error) }).boxed()
            }
        }
    }
}

type SseEvents = BoxStream<'static, Result<Event, EventStreamError<reqwest::Error>>>;

enum Phase {
    Connect { delay: Option<Duration> },
    Open(SseEvents),
    Closed,
}

struct Connection {
    client: Client,
    url: Url,
    job_id: JobId,
    retry: Duration,
    last_event_id: Option<String>,
    phase: Phase,
}

enum ConnectError {
    Retry(String),
    Fatal(String),
}

impl Connection {
    /// Sends the request for a new connection.
    ///
    /// The returned future owns everything it needs, so the connection
    /// state is not borrowed while the request is in flight.
    fn connect(&self) -> impl Future<Output = Result<SseEvents, ConnectError>> + Send + use<> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = &self.last_event_id {
            request = request.header("Last-Event-ID", id.as_str());
        }

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| ConnectError::Retry(e.to_string()))?;

            if response.status() != StatusCode::OK {
                return Err(ConnectError::Fatal(format!(
                    "Unexpected status {} for event stream",
                    response.status()
                )));
            }

            Ok(response.bytes_stream().eventsource().boxed())
        }
    }
}

async fn next_message(mut conn: Connection) -> Option<(Result<String, TrackError>, Connection)> {
    loop {
        match &mut conn.phase {
            Phase::Closed => return None,
            Phase::Connect { delay } => {
                if let Some(delay) = delay.take() {
                    tokio::time::sleep(delay).await;
                }
                debug!(job_id = %conn.job_id, "Connecting push channel");
                let connecting = conn.connect();
                match connecting.await {
                    Ok(events) => conn.phase = Phase::Open(events),
                    Err(ConnectError::Retry(message)) => {
                        conn.phase = Phase::Connect {
                            delay: Some(conn.retry),
                        };
                        return Some((Err(TrackError::Channel(message)), conn));
                    }
                    Err(ConnectError::Fatal(message)) => {
                        conn.phase = Phase::Closed;
                        return Some((Err(TrackError::Channel(message)), conn));
                    }
                }
            }
            Phase::Open(events) => {
                let next = events.next().await;
                match next {
                    Some(Ok(event)) => {
                        if !event.id.is_empty() {
                            conn.last_event_id = Some(event.id.clone());
                        }
                        if let Some(retry) = event.retry {
                            conn.retry = retry;
                        }
                        if event.event.is_empty() || event.event == "message" {
                            return Some((Ok(event.data), conn));
                        }
                    }
                    Some(Err(e)) => {
                        conn.phase = Phase::Connect {
                            delay: Some(conn.retry),
                        };
                        return Some((Err(TrackError::Channel(e.to_string())), conn));
                    }
                    None => {
                        debug!(job_id = %conn.job_id, "Push channel disconnected, reconnecting");
                        conn.phase = Phase::Connect {
                            delay: Some(conn.retry),
                        };
                    }
                }
            }
        }
    }
}
