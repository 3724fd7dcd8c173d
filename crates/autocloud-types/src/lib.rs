//! Core types for the autocloud job-processing API client.
//!
//! This crate provides the fundamental data structures used throughout autocloud:
//!
//! - [`JobId`] - Opaque identifier of a server-side job
//! - [`JobEvent`] - A named, timestamped record from a job's event log
//! - [`TrackEvent`] - Typed event delivered to tracking sinks
//! - [`ApiError`] - Failure reported by the HTTP transport
//! - [`TrackError`] - Failure reported while tracking a job

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/automationcloud/autocloud-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod event;
mod job;

pub use error::{ApiError, Result, TrackError};
pub use event::{FAIL, JOB_EVENT_OBJECT, JobEvent, SUCCESS, TrackEvent, is_terminal_name};
pub use job::JobId;
