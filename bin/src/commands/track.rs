//! Live job tracking command.

use anyhow::{Context, Result, bail};
use autocloud_lib::{Sdk, TrackEvent, event_channel};
use tracing::info;

use crate::display::{Format, track_event_line};

/// How a tracking session ended, as far as the exit status is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Running,
    Succeeded,
    Failed,
    Rejected(String),
}

impl Outcome {
    fn observe(&mut self, event: &TrackEvent) {
        match event {
            TrackEvent::Success(_) => *self = Self::Succeeded,
            TrackEvent::Fail(_) => *self = Self::Failed,
            TrackEvent::Error(err) if err.status().is_some_and(|status| status < 500) => {
                *self = Self::Rejected(err.to_string());
            }
            _ => {}
        }
    }

    fn into_result(self, job_id: &str) -> Result<()> {
        match self {
            Self::Failed => bail!("Job {job_id} failed"),
            Self::Rejected(message) => bail!("Tracking {job_id} stopped: {message}"),
            Self::Running | Self::Succeeded => Ok(()),
        }
    }
}

/// Execute the track command.
///
/// Prints every event until the session closes. Ctrl-C stops tracking.
pub(crate) async fn track(sdk: &Sdk, job_id: &str, format: Format) -> Result<()> {
    let (sink, mut events) = event_channel();
    let tracking = sdk.track_job(job_id, sink);
    let stop = tracking.stop_handle();
    info!(%job_id, strategy = %tracking.strategy(), "Tracking job");

    let mut outcome = Outcome::Running;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            signal = tokio::signal::ctrl_c(), if !stop.is_stopped() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!(%job_id, "Interrupted, stopping");
                stop.stop();
                continue;
            }
        };

        let Some(event) = event else { break };
        println!("{}", track_event_line(&event, format));
        outcome.observe(&event);
    }

    let session = tracking.finished().await?;
    info!(%job_id, offset = session.offset(), "Tracking finished");
    outcome.into_result(job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocloud_lib::{ApiError, JobEvent, TrackError};

    fn run(events: Vec<TrackEvent>) -> Outcome {
        let mut outcome = Outcome::Running;
        for event in &events {
            outcome.observe(event);
        }
        outcome
    }

    #[test]
    fn test_outcome() {
        let success = run(vec![
            TrackEvent::Error(TrackError::Api(ApiError::http(503, "Unavailable"))),
            TrackEvent::from(JobEvent::new("success", 1)),
            TrackEvent::Close,
        ]);
        assert_eq!(success, Outcome::Succeeded);
        assert!(success.into_result("j1").is_ok());

        let failed = run(vec![TrackEvent::from(JobEvent::new("fail", 1)), TrackEvent::Close]);
        assert!(failed.into_result("j1").is_err());

        let rejected = run(vec![
            TrackEvent::Error(TrackError::Api(ApiError::http(404, "Job not found"))),
            TrackEvent::Close,
        ]);
        assert!(matches!(rejected, Outcome::Rejected(_)));
        assert!(rejected.into_result("j1").is_err());

        assert!(run(vec![TrackEvent::Close]).into_result("j1").is_ok());
    }
}
