//! Node wiring: which services exist depends on the execution mode.
//!
//! ```text
//! fork:     PrometheusSource → AggregateMetricsService::single
//!
//! cluster:  UnixSocketChannel ──┬─→ Responder ("metrics-get" → local snapshot)
//!                               └─→ Broadcaster → ReplyCorrelator
//!           SocketDirSupervisor → SiblingDirectory ─┘        │
//!                                     AggregateMetricsService::cluster
//! ```

use anyhow::{Context, Result};
use fleet_telemetry::{AggregationPolicy, Aggregator, PrometheusSource};
use fm_01_process_directory::{SiblingDirectory, SocketDirSupervisor};
use fm_02_cluster_broadcast::{Broadcaster, ReplyCorrelator, Responder};
use fm_03_aggregate_metrics::AggregateMetricsService;
use shared_bus::UnixSocketChannel;
use shared_types::METRICS_GET_TOPIC;
use std::sync::Arc;
use tracing::info;

use crate::config::NodeConfig;
use crate::heartbeat::Heartbeat;

/// Service backing the HTTP routes.
pub type MetricsService = AggregateMetricsService<PrometheusSource>;

struct ClusterParts {
    channel: Arc<UnixSocketChannel>,
    responder: Responder<Arc<UnixSocketChannel>>,
}

/// A running fleet worker.
pub struct FleetNode {
    service: Arc<MetricsService>,
    cluster: Option<ClusterParts>,
    heartbeat: Heartbeat,
}

impl FleetNode {
    /// Wire and start every service for `config`.
    ///
    /// # Errors
    ///
    /// Fails in cluster mode without a process id or when the inbox socket
    /// cannot be bound, and when the heartbeat cannot be scheduled.
    pub async fn start(config: &NodeConfig) -> Result<Self> {
        let source = Arc::new(PrometheusSource::global());
        let policy = merge_policy();

        let (service, cluster) = if config.cluster.is_cluster() {
            let identity = config.cluster.identity();
            let id = identity
                .process_id()
                .context("Cluster mode requires FLEET_PROCESS_ID")?;

            let channel = Arc::new(
                UnixSocketChannel::bind(&config.cluster.socket_dir, &identity.name, id)
                    .await
                    .context("Failed to bind process inbox")?,
            );

            let supervisor =
                SocketDirSupervisor::new(&config.cluster.socket_dir, identity.name.clone());
            let directory = SiblingDirectory::new(supervisor, identity);
            let correlator =
                ReplyCorrelator::new(Broadcaster::new(Arc::clone(&channel), directory));

            let service = AggregateMetricsService::cluster(source, Arc::new(correlator))
                .with_policy(policy)
                .with_default_timeout(config.cluster.aggregate_timeout);

            let responder = Responder::new(Arc::clone(&channel))
                .with_handler(METRICS_GET_TOPIC, Arc::new(service.request_handler()));
            responder.start();

            info!(
                process = %id,
                app = %config.cluster.app_name,
                socket_dir = %config.cluster.socket_dir.display(),
                "Cluster mode enabled"
            );
            (service, Some(ClusterParts { channel, responder }))
        } else {
            info!("Single-process mode");
            let service = AggregateMetricsService::single(source)
                .with_policy(policy)
                .with_default_timeout(config.cluster.aggregate_timeout);
            (service, None)
        };

        let heartbeat =
            Heartbeat::start(config.heartbeat).context("Failed to schedule heartbeat")?;

        Ok(Self {
            service: Arc::new(service),
            cluster,
            heartbeat,
        })
    }

    /// Service answering the HTTP routes.
    pub fn service(&self) -> Arc<MetricsService> {
        Arc::clone(&self.service)
    }

    /// Returns true if the node runs in cluster mode.
    pub fn is_cluster(&self) -> bool {
        self.cluster.is_some()
    }

    /// Stop answering siblings and release the inbox socket.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.heartbeat.stop();

        if let Some(parts) = &self.cluster {
            parts.responder.stop();
            parts.channel.shutdown();
        }

        info!("Shutdown complete");
    }
}

/// Uptime is per process; summing it across siblings means nothing.
fn merge_policy() -> AggregationPolicy {
    AggregationPolicy::default().with("fleet_process_uptime_seconds", Aggregator::Max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_telemetry::register_metrics;
    use std::collections::HashMap;
    use std::time::Duration;

    fn config(pairs: &[(&str, &str)]) -> NodeConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(move |key| vars.get(key).cloned())
    }

    #[tokio::test]
    async fn test_single_mode_node() {
        register_metrics().unwrap();
        let node = FleetNode::start(&config(&[])).await.unwrap();

        assert!(!node.is_cluster());
        let registry = node.service().get_aggregate_metrics(None).await.unwrap();
        assert!(registry.family("fleet_broadcasts_total").is_some());
        node.shutdown();
    }

    #[tokio::test]
    async fn test_cluster_mode_requires_process_id() {
        let dir = tempfile::tempdir().unwrap();
        let result = FleetNode::start(&config(&[
            ("FLEET_EXEC_MODE", "cluster"),
            ("FLEET_SOCKET_DIR", dir.path().to_str().unwrap()),
        ]))
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_two_node_cluster() {
        register_metrics().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let socket_dir = dir.path().to_str().unwrap();

        let first = FleetNode::start(&config(&[
            ("FLEET_EXEC_MODE", "cluster"),
            ("FLEET_APP_NAME", "api"),
            ("FLEET_PROCESS_ID", "1"),
            ("FLEET_SOCKET_DIR", socket_dir),
        ]))
        .await
        .unwrap();
        let second = FleetNode::start(&config(&[
            ("FLEET_EXEC_MODE", "cluster"),
            ("FLEET_APP_NAME", "api"),
            ("FLEET_PROCESS_ID", "2"),
            ("FLEET_SOCKET_DIR", socket_dir),
        ]))
        .await
        .unwrap();

        let registry = first
            .service()
            .get_aggregate_metrics(Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(registry.family("fleet_process_uptime_seconds").is_some());

        first.shutdown();
        second.shutdown();
    }
}
