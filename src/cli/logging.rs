//! Tracing subscriber setup
//!
//! Diagnostics go to stderr so stdout stays one JSON response per line.
//! `-v` flags override the configured level; `RUST_LOG` overrides both.

use tracing_subscriber::EnvFilter;

use super::commands::{Config, LogFormat};

/// Filter directive for a `-v` count, or the configured level when zero.
pub fn level_for(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(config: &Config, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, &config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %config.log_level, format = ?config.log_format, "logging initialised");
    }
}
