//! Strategy selection.

use autocloud_types::JobId;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::push::{EventSourceAdapter, PushChannel};
use crate::session::{Strategy, Tracking};
use crate::{EventSink, JobEventFeed, Poller};

/// Configuration for the job tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Prefer the push channel when one is available.
    pub use_push: bool,
    /// Base interval of the poll strategy.
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            use_push: false,
            poll_interval: Poller::DEFAULT_INTERVAL,
        }
    }
}

/// What the host environment supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A push channel can be opened.
    pub push_channel: bool,
}

/// Picks the strategy for a new session.
///
/// Push is used only when the environment supports it and the
/// configuration asks for it.
#[must_use]
pub const fn select_strategy(capabilities: Capabilities, config: &TrackerConfig) -> Strategy {
    if capabilities.push_channel && config.use_push {
        Strategy::Push
    } else {
        Strategy::Poll
    }
}

/// Starts tracking sessions with the strategy the environment allows.
///
/// The strategy is fixed when a session starts; a session never switches
/// from push to poll or back.
#[derive(Debug, Clone)]
pub struct JobTracker {
    poller: Poller,
    push: Option<EventSourceAdapter>,
    capabilities: Capabilities,
    config: TrackerConfig,
}

impl JobTracker {
    /// Creates a tracker that polls `feed`.
    #[must_use]
    pub fn new(feed: Arc<dyn JobEventFeed>, config: TrackerConfig) -> Self {
        Self {
            poller: Poller::new(feed, config.poll_interval),
            push: None,
            capabilities: Capabilities::default(),
            config,
        }
    }

    /// Makes a push channel available.
    #[must_use]
    pub fn with_push_channel(mut self, channel: Arc<dyn PushChannel>) -> Self {
        self.push = Some(EventSourceAdapter::new(channel));
        self.capabilities.push_channel = true;
        self
    }

    /// Overrides the detected capabilities.
    ///
    /// Claiming push support without a channel still falls back to polling.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Returns the tracker configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Returns the capabilities used for strategy selection.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the strategy the next session will use.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match (select_strategy(self.capabilities, &self.config), &self.push) {
            (Strategy::Push, Some(_)) => Strategy::Push,
            _ => Strategy::Poll,
        }
    }

    /// Starts tracking `job_id`, delivering events to `sink`.
    pub fn track(&self, job_id: impl Into<JobId>, sink: impl EventSink) -> Tracking {
        let job_id = job_id.into();
        match (self.strategy(), &self.push) {
            (Strategy::Push, Some(adapter)) => {
                debug!(%job_id, "Tracking job over push channel");
                adapter.start(job_id, sink)
            }
            _ => {
                debug!(%job_id, interval = ?self.poller.interval(), "Tracking job by polling");
                self.poller.start(job_id, sink)
            }
        }
    }
}
