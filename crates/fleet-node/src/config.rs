//! # Node Configuration
//!
//! Everything a fleet worker reads at startup, gathered from the environment.
//!
//! ## Port Offset
//!
//! Siblings usually share one host. In cluster mode the HTTP port of
//! `FLEET_METRICS_ADDR` is offset by the process id so every worker gets its
//! own listener: process 3 of `127.0.0.1:9100` serves on `127.0.0.1:9103`.

use fleet_telemetry::TelemetryConfig;
use fm_01_process_directory::ClusterConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

/// Default HTTP listen address.
pub const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9100";

/// Default Sync Timer period for the uptime heartbeat.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(60_000);

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Execution mode, identity and aggregation settings.
    pub cluster: ClusterConfig,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// HTTP listen address, port offset already applied.
    pub metrics_addr: SocketAddr,
    /// Heartbeat period.
    pub heartbeat: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            telemetry: TelemetryConfig::default(),
            metrics_addr: default_metrics_addr(),
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

impl NodeConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster = ClusterConfig::from_lookup(&lookup);
        let telemetry = TelemetryConfig::from_lookup(&lookup);

        let base_addr = lookup("FLEET_METRICS_ADDR")
            .and_then(|raw| match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Ignoring invalid FLEET_METRICS_ADDR");
                    None
                }
            })
            .unwrap_or_else(default_metrics_addr);

        let heartbeat = lookup("FLEET_HEARTBEAT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_HEARTBEAT);

        let metrics_addr = offset_for(&cluster, base_addr);

        Self {
            cluster,
            telemetry,
            metrics_addr,
            heartbeat,
        }
    }
}

fn default_metrics_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9100))
}

fn offset_for(cluster: &ClusterConfig, mut addr: SocketAddr) -> SocketAddr {
    let Some(id) = cluster.process_id.filter(|_| cluster.is_cluster()) else {
        return addr;
    };

    match u16::try_from(id.get())
        .ok()
        .and_then(|offset| addr.port().checked_add(offset))
    {
        Some(port) => addr.set_port(port),
        None => warn!(process = %id, port = addr.port(), "Port offset overflows, keeping base port"),
    }
    addr
}
