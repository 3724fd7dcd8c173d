//! autocloud CLI - track jobs on the Automation Cloud API.

use anyhow::{Context, Result};
use autocloud_lib::url::DEFAULT_API_URL;
use autocloud_lib::{ClientConfig, Sdk, SdkConfig};
use clap::{CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "autocloud")]
#[command(about = "Track jobs on the Automation Cloud API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API secret key
    #[arg(long, env = "AUTOCLOUD_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// API base URL
    #[arg(long, env = "AUTOCLOUD_API_URL", default_value = DEFAULT_API_URL, global = true)]
    api_url: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print job events until the job succeeds or fails
    Track {
        /// Job identifier
        job_id: String,

        /// Use the server-sent events channel instead of polling
        #[arg(long)]
        push: bool,

        /// Base poll interval in milliseconds
        #[arg(long, default_value = "200")]
        interval_ms: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print one page of job events
    Events {
        /// Job identifier
        job_id: String,

        /// Number of events to skip
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Print the JSON response of an authenticated GET
    Get {
        /// Path relative to the API base URL (e.g. jobs/<id>)
        path: String,
    },
}

/// Default log level for the given flags; `RUST_LOG` takes precedence.
const fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn sdk(cli: &Cli, mut config: SdkConfig) -> Result<Sdk> {
    let token = cli
        .token
        .clone()
        .context("No API token given (use --token or AUTOCLOUD_TOKEN)")?;
    config.client = ClientConfig::new(token).with_api_url(&cli.api_url);
    Sdk::new(config).context("Failed to create API client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Track {
            job_id,
            push,
            interval_ms,
            format,
        } => {
            let config = SdkConfig::default()
                .with_push(*push)
                .with_poll_interval(Duration::from_millis(*interval_ms));
            commands::track::track(&sdk(&cli, config)?, job_id, *format).await
        }
        Commands::Events {
            job_id,
            offset,
            format,
        } => {
            commands::events::events(&sdk(&cli, SdkConfig::default())?, job_id, *offset, *format)
                .await
        }
        Commands::Get { path } => commands::get::get(&sdk(&cli, SdkConfig::default())?, path).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), "warn");
        assert_eq!(log_level(1, false), "info");
        assert_eq!(log_level(2, false), "debug");
        assert_eq!(log_level(5, false), "trace");
        assert_eq!(log_level(3, true), "error");
    }

    #[test]
    fn test_cli_parses_track() {
        let cli = Cli::try_parse_from([
            "autocloud",
            "--token",
            "secret",
            "track",
            "job-1",
            "--push",
            "--interval-ms",
            "500",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.token.as_deref(), Some("secret"));
        match cli.command {
            Some(Commands::Track {
                job_id,
                push,
                interval_ms,
                format,
            }) => {
                assert_eq!(job_id, "job-1");
                assert!(push);
                assert_eq!(interval_ms, 500);
                assert!(matches!(format, Format::Json));
            }
            _ => panic!("expected track command"),
        }
    }

    #[test]
    fn test_cli_verifies() {
        Cli::command().debug_assert();
    }
}
