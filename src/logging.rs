//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{Result, ServiceError};

/// Install the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` wins over the configured filter when it is set.
///
/// # Errors
///
/// Returns [`ServiceError::Logging`] if the filter does not parse or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), &config.filter)?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| ServiceError::Logging(e.to_string()))
}

fn build_filter(env: Option<&str>, configured: &str) -> Result<EnvFilter> {
    let directives = match env {
        Some(value) if !value.trim().is_empty() => value,
        _ => configured,
    };
    EnvFilter::try_new(directives)
        .map_err(|e| ServiceError::Logging(format!("invalid log filter {directives:?}: {e}")))
}
