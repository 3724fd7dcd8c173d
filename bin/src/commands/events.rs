//! One-shot event listing command.

use anyhow::{Context, Result};
use autocloud_lib::Sdk;

use crate::display::{Format, job_event_line};

/// Execute the events command.
pub(crate) async fn events(sdk: &Sdk, job_id: &str, offset: u64, format: Format) -> Result<()> {
    let mut events = sdk
        .job(job_id)
        .events(offset)
        .await
        .with_context(|| format!("Failed to fetch events for job {job_id}"))?;
    events.sort_by_key(|event| event.created_at);

    if events.is_empty() && matches!(format, Format::Text) {
        eprintln!("No events after offset {offset}");
    }
    for event in &events {
        println!("{}", job_event_line(event, format));
    }

    Ok(())
}
