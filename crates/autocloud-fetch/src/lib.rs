//! Authenticated HTTP transport for the autocloud job-processing API.
//!
//! This crate provides the request layer the tracking subsystem depends on:
//!
//! - [`Transport`] - The request function contract
//! - [`HttpTransport`] - `reqwest`-backed transport with Basic authentication
//! - [`RequestOptions`] - Method, query, headers, body and parsing options
//! - [`ApiClient`] - Generic `raw` requests and the job events endpoint
//! - [`url`] - Base URL canonicalization and endpoint construction

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/automationcloud/autocloud-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod client;
mod request;
pub mod url;

pub use api::ApiClient;
pub use client::{ClientConfig, ClientError, HttpTransport, Transport};
pub use request::{Method, Payload, RequestOptions};
