//! Job event tracking over server-sent events or resilient polling.
//!
//! This crate provides the tracking subsystem:
//!
//! - [`JobTracker`] - Picks a strategy once per job and starts it
//! - [`Poller`] - Offset-resuming poll loop with linear backoff
//! - [`EventSourceAdapter`] - Push strategy over a [`PushChannel`]
//! - [`SseChannel`] - Server-sent events channel with reconnection
//! - [`Tracking`] / [`StopHandle`] - Handle to a running session
//! - [`TrackingSession`] - Per-session offset and backoff state
//! - [`EventSink`] - Receiver of [`TrackEvent`](autocloud_types::TrackEvent)s

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/automationcloud/autocloud-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backoff;
mod feed;
mod poll;
mod push;
mod session;
mod sink;
mod sse;
mod tracker;

pub use backoff::{backoff_delay, retry_wait};
pub use feed::JobEventFeed;
pub use poll::Poller;
pub use push::{EventSourceAdapter, MessageStream, PushChannel};
pub use session::{StopHandle, Strategy, Tracking, TrackingSession};
pub use sink::{ChannelSink, EventSink, event_channel};
pub use sse::{SseChannel, SseConfig};
pub use tracker::{Capabilities, JobTracker, TrackerConfig, select_strategy};
