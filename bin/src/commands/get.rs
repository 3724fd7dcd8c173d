//! Raw authenticated GET command.

use anyhow::{Context, Result};
use autocloud_lib::{Payload, RequestOptions, Sdk};

/// Execute the get command.
pub(crate) async fn get(sdk: &Sdk, path: &str) -> Result<()> {
    let payload = sdk
        .raw(path.trim_start_matches('/'), RequestOptions::get())
        .await
        .with_context(|| format!("GET {path} failed"))?;

    match payload {
        Payload::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Payload::Raw(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
    }

    Ok(())
}
