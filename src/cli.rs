//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use clap::Parser;
use tracing::error;
use url::Url;

use crate::ServerConfig;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "letdesk",
    about = "Lettings back-office gateway: session routes and dashboard shell"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LETDESK_PORT", default_value = "3000")]
    pub port: u16,

    /// Base URL of the remote REST API (e.g. "http://localhost:5171")
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: String,

    /// Timeout for forwarded auth calls, in seconds
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub upstream_timeout_secs: u64,

    /// Rate-limit by the first X-Forwarded-For hop (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Page title of the dashboard shell
    #[arg(long, default_value = "Lettings Back Office")]
    pub title: String,

    /// URL of the dashboard's JavaScript bundle
    #[arg(long, env = "LETDESK_BUNDLE_URL")]
    pub bundle_url: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format. `RUST_LOG` filters.
pub fn init_logging(format: &LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Parse and validate the API base URL.
/// Returns None and logs an error if validation fails.
pub fn validate_api_base_url(api_base_url: &str) -> Option<Url> {
    let url = match Url::parse(api_base_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %api_base_url, error = %e, "Invalid API base URL");
            return None;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        error!(url = %api_base_url, "API base URL must use http or https");
        return None;
    }

    if url.cannot_be_a_base() || url.host_str().is_none() {
        error!(url = %api_base_url, "API base URL must include a host");
        return None;
    }

    Some(url)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, api_base_url: Url) -> ServerConfig {
    ServerConfig {
        api_base_url,
        upstream_timeout: Duration::from_secs(args.upstream_timeout_secs),
        trust_forwarded_for: args.trust_forwarded_for,
        title: args.title.clone(),
        bundle_url: args.bundle_url.clone(),
    }
}
