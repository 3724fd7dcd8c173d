//! Job events and the typed events delivered to tracking sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TrackError;

/// Value of the `object` field that marks a job event.
pub const JOB_EVENT_OBJECT: &str = "job-event";

/// Terminal event name for a job that completed successfully.
pub const SUCCESS: &str = "success";

/// Terminal event name for a job that failed.
pub const FAIL: &str = "fail";

/// Returns true if `name` ends a job's lifecycle.
#[must_use]
pub fn is_terminal_name(name: &str) -> bool {
    name == SUCCESS || name == FAIL
}

fn default_object() -> String {
    JOB_EVENT_OBJECT.to_string()
}

/// A named, timestamped record from a job's append-only event log.
///
/// Fields other than `name`, `createdAt` and `object` are kept verbatim in
/// [`JobEvent::fields`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    /// Server-defined event name (e.g. `"awaitingInput"`, `"success"`).
    pub name: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Object discriminator, `"job-event"` for job events.
    #[serde(default = "default_object")]
    pub object: String,
    /// Remaining payload fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl JobEvent {
    /// Creates a job event with no extra payload.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            name: name.into(),
            created_at,
            object: default_object(),
            fields: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns true if this is a `"success"` or `"fail"` event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        is_terminal_name(&self.name)
    }

    /// Returns the creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Event delivered to a tracking sink.
///
/// A session delivers any number of `Progress` and `Error` events, at most
/// one of `Success` or `Fail`, and exactly one `Close` as its final event.
#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// A non-terminal job event.
    Progress(JobEvent),
    /// The job completed successfully.
    Success(JobEvent),
    /// The job failed.
    Fail(JobEvent),
    /// A fetch or channel error. Tracking may or may not continue.
    Error(TrackError),
    /// The session ended. Always the last event.
    Close,
}

impl TrackEvent {
    /// Returns the event name as it appears on the wire.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Progress(event) | Self::Success(event) | Self::Fail(event) => &event.name,
            Self::Error(_) => "error",
            Self::Close => "close",
        }
    }

    /// Returns true for `Success` and `Fail`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Fail(_))
    }

    /// Returns the underlying job event, if any.
    #[must_use]
    pub const fn job_event(&self) -> Option<&JobEvent> {
        match self {
            Self::Progress(event) | Self::Success(event) | Self::Fail(event) => Some(event),
            _ => None,
        }
    }
}

impl From<JobEvent> for TrackEvent {
    fn from(event: JobEvent) -> Self {
        match event.name.as_str() {
            SUCCESS => Self::Success(event),
            FAIL => Self::Fail(event),
            _ => Self::Progress(event),
        }
    }
}

impl From<TrackError> for TrackEvent {
    fn from(error: TrackError) -> Self {
        Self::Error(error)
    }
}
