//! API URL construction.

use ::url::{ParseError, Url};

/// Default base URL of the autocloud API.
pub const DEFAULT_API_URL: &str = "https://api.automationcloud.net";

/// Parses a base URL, guaranteeing a trailing `/`.
///
/// Without the trailing slash, joining `jobs` onto `https://host/v1` would
/// replace the `v1` segment.
///
/// # Errors
///
/// Returns an error if `base` is not an absolute URL.
pub fn canonical_base(base: &str) -> Result<Url, ParseError> {
    if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
}

/// Resolves an API path against a canonical base URL.
///
/// Relative paths (`jobs/123`) extend the base path; paths starting with `/`
/// resolve against the host root.
///
/// # Errors
///
/// Returns an error if `path` cannot be joined onto `base`.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, ParseError> {
    base.join(path)
}

/// Path of a job's event log.
#[must_use]
pub fn events_path(job_id: &str) -> String {
    format!("jobs/{job_id}/events")
}

/// Builds the push channel URL for a job, with the token as userinfo.
///
/// # Example
///
/// ```
/// use autocloud_fetch::url::{canonical_base, event_stream_url};
///
/// let base = canonical_base("https://api.automationcloud.net").unwrap();
/// let url = event_stream_url(&base, "secret", "job-1").unwrap();
/// assert_eq!(url.as_str(), "https://secret@api.automationcloud.net/jobs/job-1/events");
/// ```
///
/// # Errors
///
/// Returns an error if the URL cannot carry credentials.
pub fn event_stream_url(base: &Url, token: &str, job_id: &str) -> Result<Url, ParseError> {
    let mut url = endpoint(base, &events_path(job_id))?;
    // Only URLs without a host reject userinfo.
    url.set_username(token).map_err(|()| ParseError::EmptyHost)?;
    url.set_password(None).map_err(|()| ParseError::EmptyHost)?;
    Ok(url)
}
