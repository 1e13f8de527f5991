//! # Fleet Node
//!
//! One worker of a fleet. Every worker serves `GET /metrics` for the whole
//! fleet: in cluster mode it asks its siblings for their snapshots over the
//! per-process Unix sockets and merges them.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialise logging and register the protocol metrics
//! 3. Wire the services (cluster mode: bind inbox, start responder)
//! 4. Start the uptime heartbeat
//! 5. Serve HTTP until Ctrl+C

use anyhow::{Context, Result};
use fleet_node::{router, FleetNode, NodeConfig};
use fleet_telemetry::{init_logging, register_metrics};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env();

    init_logging(&config.telemetry).context("Failed to initialise logging")?;
    register_metrics().context("Failed to register metrics")?;

    info!(
        app = %config.cluster.app_name,
        mode = ?config.cluster.exec_mode,
        "Starting fleet node v{}",
        env!("CARGO_PKG_VERSION")
    );

    let node = match FleetNode::start(&config).await {
        Ok(node) => node,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Node failed to start");
            return Err(e);
        }
    };

    let listener = tokio::net::TcpListener::bind(config.metrics_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.metrics_addr))?;
    info!(addr = %config.metrics_addr, "Serving metrics");

    axum::serve(listener, router(node.service()))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
        })
        .await
        .context("HTTP server failed")?;

    node.shutdown();
    Ok(())
}
