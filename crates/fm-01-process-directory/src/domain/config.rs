//! Environment configuration for the cluster protocol.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `FLEET_EXEC_MODE` | `fork` | `cluster` / `cluster_mode` enables multi-process mode |
//! | `FLEET_APP_NAME` | `fleet-app` | logical name shared by siblings |
//! | `FLEET_PROCESS_ID` | none | numeric identity |
//! | `FLEET_SOCKET_DIR` | `$TMPDIR/fleet` | directory of per-process sockets |
//! | `FLEET_AGGREGATE_TIMEOUT_MS` | `10000` | default aggregate query timeout |

use super::identity::ProcessIdentity;
use shared_types::ProcessId;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default logical application name.
pub const DEFAULT_APP_NAME: &str = "fleet-app";

/// Default aggregate query timeout.
pub const DEFAULT_AGGREGATE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// How the supervisor runs this application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Several sibling processes share one logical name.
    Cluster,
    /// A single standalone process.
    #[default]
    Fork,
}

impl ExecMode {
    /// Parse the supervisor's execution-mode value.
    ///
    /// Anything other than `cluster` / `cluster_mode` means single-process.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "cluster" | "cluster_mode" => Self::Cluster,
            _ => Self::Fork,
        }
    }
}

/// Cluster protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Execution mode
    pub exec_mode: ExecMode,
    /// Logical name shared by siblings
    pub app_name: String,
    /// Numeric identity, if the supervisor assigned one
    pub process_id: Option<ProcessId>,
    /// Directory holding one inbox socket per process
    pub socket_dir: PathBuf,
    /// Default timeout for aggregate queries
    pub aggregate_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            exec_mode: ExecMode::Fork,
            app_name: DEFAULT_APP_NAME.to_string(),
            process_id: None,
            socket_dir: env::temp_dir().join("fleet"),
            aggregate_timeout: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }
}

impl ClusterConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let process_id = lookup("FLEET_PROCESS_ID").and_then(|raw| match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring invalid FLEET_PROCESS_ID");
                None
            }
        });

        Self {
            exec_mode: lookup("FLEET_EXEC_MODE")
                .map(|v| ExecMode::parse(&v))
                .unwrap_or(defaults.exec_mode),

            app_name: lookup("FLEET_APP_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.app_name),

            process_id,

            socket_dir: lookup("FLEET_SOCKET_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.socket_dir),

            aggregate_timeout: lookup("FLEET_AGGREGATE_TIMEOUT_MS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.aggregate_timeout),
        }
    }

    /// Returns true in multi-process mode.
    #[must_use]
    pub fn is_cluster(&self) -> bool {
        self.exec_mode == ExecMode::Cluster
    }

    /// Identity of the current process.
    #[must_use]
    pub fn identity(&self) -> ProcessIdentity {
        ProcessIdentity {
            name: self.app_name.clone(),
            id: self.process_id,
        }
    }
}
