//! Poll strategy: resumable fetches of the job event log.

use autocloud_types::{JobId, TrackError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backoff::{backoff_delay, retry_wait};
use crate::session::{Emitter, StopHandle, Strategy, Tracking, TrackingSession};
use crate::{EventSink, JobEventFeed};

/// Tracks a job by polling its event log.
///
/// Each iteration waits the base interval, then fetches the events after the
/// current offset. A successful batch is sorted by creation time and
/// dispatched; a `success` or `fail` event ends the session. Client errors
/// (status below 500) end the session after one `Error`. Server and network
/// errors are reported and retried after an extra `level * interval`.
///
/// The backoff has no cap and retries never give up, so a persistently
/// failing server keeps the session alive until it is stopped.
#[derive(Debug, Clone)]
pub struct Poller {
    feed: Arc<dyn JobEventFeed>,
    interval: Duration,
}

impl Poller {
    /// Default base interval between fetches.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

    /// Creates a poller with the given base interval.
    #[must_use]
    pub fn new(feed: Arc<dyn JobEventFeed>, interval: Duration) -> Self {
        Self { feed, interval }
    }

    /// Returns the base interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts tracking `job_id` on a new task.
    ///
    /// The first fetch happens after one interval, not immediately.
    pub fn start(&self, job_id: impl Into<JobId>, sink: impl EventSink) -> Tracking {
        let stop = StopHandle::new();
        let session = TrackingSession::new(job_id.into(), Strategy::Poll);
        let emitter = Emitter::new(sink, stop.clone());
        let run = poll_loop(Arc::clone(&self.feed), self.interval, session, emitter);
        Tracking::spawn(stop, Strategy::Poll, run)
    }
}

async fn poll_loop<S: EventSink>(
    feed: Arc<dyn JobEventFeed>,
    interval: Duration,
    mut session: TrackingSession,
    mut emitter: Emitter<S>,
) -> TrackingSession {
    let stop = emitter.stop_handle().clone();
    debug!(job_id = %session.job_id(), ?interval, "Polling job events");

    loop {
        if !stop.sleep(interval).await {
            break;
        }

        // A detached task: stopping mid-request lets it finish, and its
        // result is dropped with the join handle.
        let fetch = {
            let feed = Arc::clone(&feed);
            let job_id = session.job_id().clone();
            let offset = session.offset();
            tokio::spawn(async move { feed.job_events(job_id.as_str(), offset).await })
        };

        let result = tokio::select! {
            biased;
            () = stop.stopped() => break,
            joined = fetch => joined,
        };

        match result {
            Ok(Ok(mut events)) => {
                session.record_batch(events.len() as u64);
                events.sort_by_key(|event| event.created_at);
                debug!(
                    job_id = %session.job_id(),
                    count = events.len(),
                    offset = session.offset(),
                    "Fetched job events"
                );

                let job_id = session.job_id().clone();
                if !events
                    .into_iter()
                    .all(|event| emitter.job_event(&job_id, event))
                {
                    break;
                }
            }
            Ok(Err(err)) if err.is_client_error() => {
                warn!(job_id = %session.job_id(), error = %err, "Job events request rejected");
                emitter.error(TrackError::Api(err));
                break;
            }
            Ok(Err(err)) => {
                let level = session.record_failure();
                warn!(
                    job_id = %session.job_id(),
                    error = %err,
                    "Error contacting API. Retrying in {:.1} s",
                    retry_wait(interval, level).as_secs_f64()
                );
                if !emitter.error(TrackError::Api(err)) {
                    break;
                }
                if !stop.sleep(backoff_delay(interval, level)).await {
                    break;
                }
            }
            Err(join_error) => {
                emitter.error(TrackError::Task(join_error.to_string()));
                break;
            }
        }
    }

    emitter.close(&mut session);
    session
}
