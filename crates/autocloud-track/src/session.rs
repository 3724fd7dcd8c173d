//! Tracking session state and the handles returned to callers.

use autocloud_types::{JobEvent, JobId, TrackError, TrackEvent};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::EventSink;

/// Strategy used by a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Server-sent events.
    Push,
    /// Polling the event log.
    Poll,
}

impl Strategy {
    /// Returns the strategy as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "sse",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state of one tracking session.
///
/// Owned by the session task and handed back through [`Tracking::finished`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingSession {
    job_id: JobId,
    offset: u64,
    backoff_level: u32,
    stopped: bool,
    strategy: Strategy,
}

impl TrackingSession {
    /// Creates a fresh session at offset 0.
    #[must_use]
    pub const fn new(job_id: JobId, strategy: Strategy) -> Self {
        Self {
            job_id,
            offset: 0,
            backoff_level: 0,
            stopped: false,
            strategy,
        }
    }

    /// The tracked job.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Number of job events observed so far.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of consecutive transient failures.
    #[must_use]
    pub const fn backoff_level(&self) -> u32 {
        self.backoff_level
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Records a successful fetch of `count` events.
    pub const fn record_batch(&mut self, count: u64) {
        self.backoff_level = 0;
        self.offset = self.offset.saturating_add(count);
    }

    /// Records a transient failure and returns the new backoff level.
    pub const fn record_failure(&mut self) -> u32 {
        self.backoff_level = self.backoff_level.saturating_add(1);
        self.backoff_level
    }

    pub(crate) const fn mark_stopped(&mut self) {
        self.stopped = true;
    }
}

/// Idempotent, cloneable handle that ends a tracking session.
///
/// Stopping is cooperative: the session task observes it at its next
/// suspension point or before dispatching its next event, then dispatches
/// `Close` exactly once. An event whose dispatch had already begun when
/// [`StopHandle::stop`] was called still completes; no dispatch starts
/// after that.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stops the session. Calling it again has no effect.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Returns true once the session has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the session is stopped.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }

    /// Sleeps for `duration` unless stopped first. Returns false if stopped.
    pub(crate) async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.token.cancelled() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

/// Handle to a running tracking session.
///
/// Dropping it does not stop the session; use [`Tracking::stop`] or a
/// [`StopHandle`].
#[derive(Debug)]
pub struct Tracking {
    stop: StopHandle,
    strategy: Strategy,
    task: JoinHandle<TrackingSession>,
}

impl Tracking {
    pub(crate) fn spawn<F>(stop: StopHandle, strategy: Strategy, session: F) -> Self
    where
        F: Future<Output = TrackingSession> + Send + 'static,
    {
        Self {
            stop,
            strategy,
            task: tokio::spawn(session),
        }
    }

    /// Returns a handle that stops this session.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stops the session. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Strategy chosen for this session.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Returns true once the session task has delivered `Close` and exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end and returns its final state.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Task`] if the session task panicked.
    pub async fn finished(self) -> Result<TrackingSession, TrackError> {
        self.task.await.map_err(|e| TrackError::Task(e.to_string()))
    }
}

/// Delivers events to a sink on behalf of a session task.
///
/// No dispatch other than `Close` starts once the stop handle has fired,
/// and `Close` is delivered exactly once because [`Emitter::close`]
/// consumes the emitter. Stopping does not wait for a dispatch in progress,
/// so it can be called from inside the sink.
pub(crate) struct Emitter<S> {
    sink: S,
    stop: StopHandle,
}

impl<S: EventSink> Emitter<S> {
    pub(crate) const fn new(sink: S, stop: StopHandle) -> Self {
        Self { sink, stop }
    }

    pub(crate) const fn stop_handle(&self) -> &StopHandle {
        &self.stop
    }

    /// Dispatches a job event. Returns false when the session must end.
    pub(crate) fn job_event(&mut self, job_id: &JobId, event: JobEvent) -> bool {
        if self.stop.is_stopped() {
            return false;
        }

        let event = TrackEvent::from(event);
        let terminal = event.is_terminal();
        if terminal {
            info!(%job_id, event = event.name(), "Job reached a terminal state");
        }
        self.sink.on_event(event);

        if terminal {
            self.stop.stop();
        }
        !self.stop.is_stopped()
    }

    /// Dispatches an error. Returns false when the session must end.
    pub(crate) fn error(&mut self, error: TrackError) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        self.sink.on_event(TrackEvent::Error(error));
        !self.stop.is_stopped()
    }

    /// Ends the session and dispatches the final `Close`.
    pub(crate) fn close(mut self, session: &mut TrackingSession) {
        self.stop.stop();
        session.mark_stopped();
        info!(job_id = %session.job_id(), offset = session.offset(), "Job tracking closed");
        self.sink.on_event(TrackEvent::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocloud_types::ApiError;
    use std::sync::{Arc, Mutex};

    fn recording() -> (impl EventSink, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |event: TrackEvent| seen.lock().unwrap().push(event.name().to_string())
        };
        (sink, seen)
    }

    #[test]
    fn test_session_offsets_and_backoff() {
        let mut session = TrackingSession::new(JobId::from("j1"), Strategy::Poll);
        assert_eq!(session.offset(), 0);

        session.record_batch(3);
        assert_eq!(session.record_failure(), 1);
        assert_eq!(session.record_failure(), 2);
        assert_eq!(session.offset(), 3);

        session.record_batch(0);
        assert_eq!(session.backoff_level(), 0);
        assert_eq!(session.offset(), 3);
        assert!(!session.is_stopped());
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Push.to_string(), "sse");
        assert_eq!(Strategy::Poll.to_string(), "poll");
    }

    #[test]
    fn test_stop_handle_is_idempotent() {
        let stop = StopHandle::new();
        let other = stop.clone();
        assert!(!stop.is_stopped());

        stop.stop();
        other.stop();
        stop.stop();
        assert!(stop.is_stopped());
        assert!(other.is_stopped());
    }

    #[test]
    fn test_emitter_stops_after_terminal_event() {
        let job_id = JobId::from("j1");
        let (sink, seen) = recording();
        let mut session = TrackingSession::new(job_id.clone(), Strategy::Poll);
        let mut emitter = Emitter::new(sink, StopHandle::new());

        assert!(emitter.job_event(&job_id, JobEvent::new("processing", 1)));
        assert!(!emitter.job_event(&job_id, JobEvent::new("success", 2)));
        assert!(!emitter.job_event(&job_id, JobEvent::new("processing", 3)));
        assert!(!emitter.error(ApiError::network("late").into()));
        emitter.close(&mut session);

        assert_eq!(*seen.lock().unwrap(), vec!["processing", "success", "close"]);
        assert!(session.is_stopped());
    }

    #[test]
    fn test_emitter_drops_events_after_stop() {
        let job_id = JobId::from("j1");
        let (sink, seen) = recording();
        let stop = StopHandle::new();
        let mut session = TrackingSession::new(job_id.clone(), Strategy::Push);
        let mut emitter = Emitter::new(sink, stop.clone());

        stop.stop();
        assert!(!emitter.job_event(&job_id, JobEvent::new("processing", 1)));
        emitter.close(&mut session);

        assert_eq!(*seen.lock().unwrap(), vec!["close"]);
    }

    #[test]
    fn test_stop_during_dispatch_completes_only_that_event() {
        let job_id = JobId::from("j1");
        let stop = StopHandle::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (resume_tx, resume_rx) = std::sync::mpsc::channel::<()>();

        let sink = {
            let seen = Arc::clone(&seen);
            move |event: TrackEvent| {
                let name = event.name().to_string();
                if name == "processing" {
                    entered_tx.send(()).unwrap();
                    resume_rx.recv().unwrap();
                }
                seen.lock().unwrap().push(name);
            }
        };

        let worker = {
            let stop = stop.clone();
            let job_id = job_id.clone();
            std::thread::spawn(move || {
                let mut session = TrackingSession::new(job_id.clone(), Strategy::Poll);
                let mut emitter = Emitter::new(sink, stop);
                let first = emitter.job_event(&job_id, JobEvent::new("processing", 1));
                let second = emitter.job_event(&job_id, JobEvent::new("awaitingInput", 2));
                emitter.close(&mut session);
                (first, second)
            })
        };

        entered_rx.recv().unwrap();
        stop.stop();
        resume_tx.send(()).unwrap();
        let (first, second) = worker.join().unwrap();

        assert!(!first);
        assert!(!second);
        assert_eq!(*seen.lock().unwrap(), vec!["processing", "close"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_stop() {
        let stop = StopHandle::new();
        let sleeper = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.sleep(Duration::from_secs(60)).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.stop();

        assert!(!sleeper.await.unwrap());
        assert!(StopHandle::new().sleep(Duration::from_millis(5)).await);
    }
}
