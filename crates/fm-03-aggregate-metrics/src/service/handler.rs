//! Answers `metrics-get` requests with the local snapshot.

use async_trait::async_trait;
use fleet_telemetry::MetricsSource;
use fm_02_cluster_broadcast::RequestHandler;
use serde_json::Value;
use shared_types::{ClusterError, ProcessPacket};
use std::sync::Arc;

/// `RequestHandler` returning this process's metrics snapshot.
pub struct MetricsRequestHandler<S: MetricsSource> {
    source: Arc<S>,
}

impl<S: MetricsSource> MetricsRequestHandler<S> {
    /// Answer from `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: MetricsSource> RequestHandler for MetricsRequestHandler<S> {
    async fn handle(&self, request: &ProcessPacket) -> Result<Value, ClusterError> {
        let failed = |reason: String| ClusterError::HandlerFailed {
            topic: request.topic.clone(),
            reason,
        };

        let snapshot = self.source.snapshot().map_err(|e| failed(e.to_string()))?;
        snapshot.to_value().map_err(|e| failed(e.to_string()))
    }
}
