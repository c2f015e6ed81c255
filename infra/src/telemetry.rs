//! Tracing subscriber setup
//!
//! Builds the subscriber described by [`LoggingConfig`]. `RUST_LOG` overrides
//! the configured level when it is set and parses.

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use smsflow_shared::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Build a dispatcher without installing it
///
/// Hosts that scope logging per test or per task use this with
/// `tracing::dispatcher::with_default`.
pub fn build_dispatch(config: &LoggingConfig) -> Result<Dispatch, InfrastructureError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.show_target)
        .with_file(config.show_source)
        .with_line_number(config.show_source);

    let dispatch = match config.format {
        LogFormat::Json => Dispatch::new(builder.json().finish()),
        LogFormat::Pretty => Dispatch::new(builder.pretty().finish()),
        LogFormat::Compact => Dispatch::new(builder.compact().finish()),
    };
    Ok(dispatch)
}

/// Install the configured subscriber as the process-wide default
pub fn init(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let dispatch = build_dispatch(config)?;
    tracing::dispatcher::set_global_default(dispatch).map_err(|e| InfrastructureError::Telemetry(e.to_string()))
}

fn parse_filter(level: &str) -> Result<EnvFilter, InfrastructureError> {
    EnvFilter::try_new(level).map_err(|e| InfrastructureError::Telemetry(format!("invalid log level {:?}: {}", level, e)))
}
