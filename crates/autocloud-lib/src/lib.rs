//! Client library for the Automation Cloud job API.
//!
//! This is a facade crate that re-exports functionality from the autocloud
//! workspace crates and wires them together in [`Sdk`].
//!
//! # Quick Start
//!
//! ```ignore
//! use autocloud_lib::prelude::*;
//!
//! let sdk = Sdk::new(SdkConfig::new(token))?;
//! let tracking = sdk.job("job-id").track(|event: TrackEvent| println!("{}", event.name()));
//! let session = tracking.finished().await?;
//! println!("Saw {} events", session.offset());
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/automationcloud/autocloud-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(feature = "track")]
mod sdk;

// Re-export core types
pub use autocloud_types::*;

// Re-export transport
pub use autocloud_fetch::{
    ApiClient, ClientConfig, ClientError, HttpTransport, Method, Payload, RequestOptions,
    Transport, url,
};

// Re-export tracking
#[cfg(feature = "track")]
pub use autocloud_track::{
    Capabilities, ChannelSink, EventSink, EventSourceAdapter, JobEventFeed, JobTracker,
    MessageStream, Poller, PushChannel, SseChannel, SseConfig, StopHandle, Strategy, Tracking,
    TrackerConfig, TrackingSession, event_channel, select_strategy,
};

#[cfg(feature = "track")]
pub use sdk::{JobBinding, Sdk, SdkConfig};

/// Prelude module for convenient imports.
///
/// ```
/// use autocloud_lib::prelude::*;
/// ```
pub mod prelude {
    pub use autocloud_types::{ApiError, JobEvent, JobId, Result, TrackError, TrackEvent};

    pub use autocloud_fetch::{ApiClient, ClientConfig, ClientError, Payload, RequestOptions};

    #[cfg(feature = "track")]
    pub use autocloud_track::{
        EventSink, StopHandle, Strategy, Tracking, TrackerConfig, TrackingSession, event_channel,
    };

    #[cfg(feature = "track")]
    pub use crate::sdk::{JobBinding, Sdk, SdkConfig};
}
