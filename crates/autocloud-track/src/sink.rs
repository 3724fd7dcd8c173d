//! Event sinks.

use autocloud_types::TrackEvent;
use tokio::sync::mpsc;

/// Receives the events of one tracking session, in order.
///
/// Implemented for any `FnMut(TrackEvent)` closure. The sink runs on the
/// session's task, so it must be `Send + 'static` and should not block.
pub trait EventSink: Send + 'static {
    /// Handles one event.
    fn on_event(&mut self, event: TrackEvent);
}

impl<F> EventSink for F
where
    F: FnMut(TrackEvent) + Send + 'static,
{
    fn on_event(&mut self, event: TrackEvent) {
        self(event);
    }
}

/// Sink forwarding events into an unbounded channel.
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TrackEvent>,
}

impl EventSink for ChannelSink {
    fn on_event(&mut self, event: TrackEvent) {
        let _ = self.tx.send(event);
    }
}

/// Creates a sink and the receiver its events arrive on.
///
/// The receiver yields `None` after the session's final `Close` once the
/// session task has finished.
#[must_use]
pub fn event_channel() -> (ChannelSink, mpsc::UnboundedReceiver<TrackEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}
