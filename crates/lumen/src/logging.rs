//! Log output for host binaries.
//!
//! Filter precedence: `RUST_LOG`, then `[logging] filter`, then `info`.

use tracing_subscriber::EnvFilter;

use lumen_core::{HostError, HostResult};

use crate::config::LoggingConfig;

/// Resolves the filter the host will log with.
///
/// # Errors
///
/// Returns [`HostError::InvalidConfig`] if `RUST_LOG` is unset and the
/// configured directive does not parse.
pub fn resolve_filter(config: &LoggingConfig) -> HostResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    if config.filter.trim().is_empty() {
        return Ok(EnvFilter::new("info"));
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| HostError::InvalidConfig(format!("logging.filter {:?}: {e}", config.filter)))
}

/// Installs the global `tracing` subscriber.
///
/// Installing twice is harmless: the first subscriber stays.
///
/// # Errors
///
/// Returns [`HostError::InvalidConfig`] if the filter does not parse.
pub fn init(config: &LoggingConfig) -> HostResult<()> {
    let filter = resolve_filter(config)?;
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
