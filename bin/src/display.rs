//! Output formatting for the autocloud CLI.

use autocloud_lib::{JobEvent, TrackEvent};
use clap::ValueEnum;
use serde_json::{Value, json};

/// Output format for events.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    /// One human-readable line per event
    Text,
    /// One JSON document per line
    Json,
}

/// Renders a job event as a single line.
pub(crate) fn job_event_line(event: &JobEvent, format: Format) -> String {
    match format {
        Format::Text => {
            let at = event.created_at_utc().map_or_else(
                || event.created_at.to_string(),
                |at| at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            );
            if event.fields.is_empty() {
                format!("[{at}] {}", event.name)
            } else {
                format!("[{at}] {} {}", event.name, Value::Object(event.fields.clone()))
            }
        }
        Format::Json => serde_json::to_string(event).unwrap_or_else(|_| event.name.clone()),
    }
}

/// Renders a tracking event as a single line.
pub(crate) fn track_event_line(event: &TrackEvent, format: Format) -> String {
    match (event, format) {
        (TrackEvent::Error(err), Format::Text) => format!("error: {err}"),
        (TrackEvent::Error(err), Format::Json) => json!({
            "object": "error",
            "status": err.status(),
            "message": err.to_string(),
        })
        .to_string(),
        (TrackEvent::Close, Format::Text) => "closed".to_string(),
        (TrackEvent::Close, Format::Json) => json!({ "object": "close" }).to_string(),
        (event, format) => event
            .job_event()
            .map_or_else(|| event.name().to_string(), |e| job_event_line(e, format)),
    }
}
