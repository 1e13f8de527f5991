//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` fmt subscriber. Records carry the target
//! and thread id; JSON output is available for log shippers.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed, which
/// makes repeated calls (tests, embedded use) harmless.
///
/// # Errors
///
/// Returns `TelemetryError::Config` if the log filter does not parse.
pub fn init_logging(config: &TelemetryConfig) -> Result<bool, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter '{}': {e}", config.log_level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let installed = if config.json_logs {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            service = %config.service_name,
            json_logs = config.json_logs,
            "Logging initialized"
        );
    }

    Ok(installed)
}
