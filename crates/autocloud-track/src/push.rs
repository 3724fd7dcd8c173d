//! Push strategy: forwarding a live message stream.

use autocloud_types::{JOB_EVENT_OBJECT, JobEvent, JobId, TrackError};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::EventSink;
use crate::session::{Emitter, StopHandle, Strategy, Tracking, TrackingSession};

/// Raw message payloads from a push connection.
///
/// `Err` items are channel-level errors; the channel decides whether more
/// items follow. Dropping the stream closes the connection.
pub type MessageStream = BoxStream<'static, Result<String, TrackError>>;

/// A push channel able to open one live connection per job.
pub trait PushChannel: Send + Sync + fmt::Debug + 'static {
    /// Opens the connection for `job_id`.
    fn open(&self, job_id: &JobId) -> MessageStream;
}

/// Parses one pushed message.
///
/// Returns `Ok(None)` for well-formed messages that are not job events.
pub(crate) fn parse_message(data: &str) -> Result<Option<JobEvent>, TrackError> {
    let value: Value = serde_json::from_str(data).map_err(|e| TrackError::Parse(e.to_string()))?;

    if value.get("object").and_then(Value::as_str) != Some(JOB_EVENT_OBJECT) {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| TrackError::Parse(e.to_string()))
}

/// Tracks a job through a [`PushChannel`].
///
/// Malformed messages and channel errors are reported as `Error` and the
/// session keeps listening; reconnection is left to the channel.
#[derive(Debug, Clone)]
pub struct EventSourceAdapter {
    channel: Arc<dyn PushChannel>,
}

impl EventSourceAdapter {
    /// Creates an adapter over the given channel.
    #[must_use]
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self { channel }
    }

    /// Opens a connection for `job_id` and forwards its events on a new task.
    pub fn start(&self, job_id: impl Into<JobId>, sink: impl EventSink) -> Tracking {
        let stop = StopHandle::new();
        let session = TrackingSession::new(job_id.into(), Strategy::Push);
        let emitter = Emitter::new(sink, stop.clone());
        let run = forward(Arc::clone(&self.channel), session, emitter);
        Tracking::spawn(stop, Strategy::Push, run)
    }
}

async fn forward<S: EventSink>(
    channel: Arc<dyn PushChannel>,
    mut session: TrackingSession,
    mut emitter: Emitter<S>,
) -> TrackingSession {
    let stop = emitter.stop_handle().clone();
    let job_id = session.job_id().clone();
    let mut messages = channel.open(&job_id);
    debug!(%job_id, "Opened push channel");

    loop {
        let next = tokio::select! {
            biased;
            () = stop.stopped() => break,
            next = messages.next() => next,
        };

        let keep_going = match next {
            Some(Ok(data)) => match parse_message(&data) {
                Ok(Some(event)) => {
                    session.record_batch(1);
                    emitter.job_event(&job_id, event)
                }
                Ok(None) => {
                    trace!(%job_id, "Ignoring message that is not a job event");
                    true
                }
                Err(err) => emitter.error(err),
            },
            Some(Err(err)) => emitter.error(err),
            None => {
                debug!(%job_id, "Push channel ended, waiting for stop");
                stop.stopped().await;
                false
            }
        };

        if !keep_going {
            break;
        }
    }

    drop(messages);
    emitter.close(&mut session);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_channel;
    use autocloud_types::TrackEvent;
    use futures::stream;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Channel replaying a script once, optionally staying open afterwards.
    #[derive(Debug)]
    struct ScriptedChannel {
        script: Mutex<Vec<Result<String, TrackError>>>,
        stay_open: bool,
        opened: Mutex<Vec<JobId>>,
    }

    impl ScriptedChannel {
        fn new(script: Vec<Result<String, TrackError>>, stay_open: bool) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                stay_open,
                opened: Mutex::new(Vec::new()),
            })
        }
    }

    impl PushChannel for ScriptedChannel {
        fn open(&self, job_id: &JobId) -> MessageStream {
            self.opened.lock().unwrap().push(job_id.clone());
            let script = std::mem::take(&mut *self.script.lock().unwrap());
            let replay = stream::iter(script);
            if self.stay_open {
                replay.chain(stream::pending()).boxed()
            } else {
                replay.boxed()
            }
        }
    }

    fn message(object: &str, name: &str, created_at: i64) -> Result<String, TrackError> {
        Ok(format!(
            r#"{{"object":"{object}","name":"{name}","createdAt":{created_at}}}"#
        ))
    }

    async fn drain(mut rx: UnboundedReceiver<TrackEvent>) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(event) = rx.recv().await {
            names.push(event.name().to_string());
        }
        names
    }

    #[test]
    fn test_parse_message() {
        let event = parse_message(r#"{"object":"job-event","name":"processing","createdAt":5}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.name, "processing");

        assert!(parse_message(r#"{"object":"heartbeat"}"#).unwrap().is_none());
        assert!(parse_message(r#"{"name":"processing"}"#).unwrap().is_none());
        assert!(matches!(parse_message("{oops"), Err(TrackError::Parse(_))));
        assert!(matches!(
            parse_message(r#"{"object":"job-event","name":"processing"}"#),
            Err(TrackError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_forwards_events_until_terminal() {
        let channel = ScriptedChannel::new(
            vec![
                message("job-event", "processing", 1),
                message("heartbeat", "ping", 2),
                Ok("not json".to_string()),
                message("job-event", "awaitingInput", 3),
                message("job-event", "success", 4),
                message("job-event", "processing", 5),
            ],
            true,
        );
        let (sink, rx) = event_channel();

        let tracking = EventSourceAdapter::new(channel.clone()).start("job-7", sink);
        assert_eq!(tracking.strategy(), Strategy::Push);
        let session = tracking.finished().await.unwrap();

        assert_eq!(
            drain(rx).await,
            vec!["processing", "error", "awaitingInput", "success", "close"]
        );
        assert_eq!(session.offset(), 3);
        assert_eq!(*channel.opened.lock().unwrap(), vec![JobId::from("job-7")]);
    }

    #[tokio::test]
    async fn test_channel_errors_are_not_fatal() {
        let channel = ScriptedChannel::new(
            vec![
                Err(TrackError::Channel("connection reset".into())),
                message("job-event", "processing", 1),
                message("job-event", "fail", 2),
            ],
            true,
        );
        let (sink, rx) = event_channel();

        EventSourceAdapter::new(channel)
            .start("job-7", sink)
            .finished()
            .await
            .unwrap();

        assert_eq!(drain(rx).await, vec!["error", "processing", "fail", "close"]);
    }

    #[tokio::test]
    async fn test_stop_closes_once() {
        let channel = ScriptedChannel::new(vec![message("job-event", "processing", 1)], true);
        let (sink, mut rx) = event_channel();

        let tracking = EventSourceAdapter::new(channel).start("job-7", sink);
        assert_eq!(rx.recv().await.map(|e| e.name().to_string()).as_deref(), Some("processing"));

        let handle = tracking.stop_handle();
        handle.stop();
        tracking.stop();
        let session = tracking.finished().await.unwrap();
        handle.stop();

        assert_eq!(drain(rx).await, vec!["close"]);
        assert!(session.is_stopped());
    }

    #[tokio::test]
    async fn test_ended_channel_waits_for_stop() {
        let channel = ScriptedChannel::new(vec![message("job-event", "processing", 1)], false);
        let (sink, mut rx) = event_channel();

        let tracking = EventSourceAdapter::new(channel).start("job-7", sink);
        assert!(rx.recv().await.is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!tracking.is_finished());

        tracking.stop();
        tracking.finished().await.unwrap();
        assert_eq!(drain(rx).await, vec!["close"]);
    }
}
