//! Logging setup
//!
//! Logs always go to stderr: stdout carries the MCP protocol stream.

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` wins, then `--verbose`, then the config level
pub fn env_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    build_filter(config, verbose, directives.as_deref())
}

/// Same as [`env_filter`] with the `RUST_LOG` value passed in
///
/// Unparseable directives are dropped. An unknown configured level falls back
/// to `info`.
pub fn build_filter(config: &LoggingConfig, verbose: bool, directives: Option<&str>) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        config.level.to_lowercase().parse().unwrap_or(LevelFilter::INFO)
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config, verbose))
        .with_writer(std::io::stderr);

    let result = match config.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
