//! Aggregate Query Facade
//!
//! ```text
//! single-process:  local registry ─────────────────────────────→ MergedRegistry
//! cluster:         collect("metrics-get") → decode payloads → merge_snapshots
//! ```

use fleet_telemetry::{
    merge_snapshots, AggregationPolicy, MergedRegistry, MetricsSnapshot, MetricsSource,
};
use fm_01_process_directory::domain::config::DEFAULT_AGGREGATE_TIMEOUT;
use shared_types::{ClusterError, ProcessPacket, METRICS_GET_TOPIC};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::ports::ReplyCollector;
use crate::service::MetricsRequestHandler;

enum Mode {
    Single,
    Cluster(Arc<dyn ReplyCollector>),
}

/// "The" metrics of the application, whichever process is asked.
pub struct AggregateMetricsService<S: MetricsSource> {
    source: Arc<S>,
    mode: Mode,
    policy: AggregationPolicy,
    default_timeout: Duration,
}

impl<S: MetricsSource> AggregateMetricsService<S> {
    /// Single-process mode: the local registry is the answer.
    pub fn single(source: Arc<S>) -> Self {
        Self {
            source,
            mode: Mode::Single,
            policy: AggregationPolicy::default(),
            default_timeout: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }

    /// Cluster mode: ask every sibling through `collector` and merge.
    pub fn cluster(source: Arc<S>, collector: Arc<dyn ReplyCollector>) -> Self {
        Self {
            source,
            mode: Mode::Cluster(collector),
            policy: AggregationPolicy::default(),
            default_timeout: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }

    /// Merge with `policy` instead of summing everything.
    #[must_use]
    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Timeout used when the caller does not pass one.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns true in cluster mode.
    pub fn is_cluster(&self) -> bool {
        matches!(self.mode, Mode::Cluster(_))
    }

    /// Timeout used when the caller does not pass one.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Handler answering sibling `metrics-get` requests from the same source.
    pub fn request_handler(&self) -> MetricsRequestHandler<S> {
        MetricsRequestHandler::new(Arc::clone(&self.source))
    }

    /// This process's registry alone.
    ///
    /// # Errors
    ///
    /// `SnapshotUnavailable` if the source cannot be read.
    pub fn local_registry(&self) -> Result<MergedRegistry, ClusterError> {
        let snapshot = self
            .source
            .snapshot()
            .map_err(|e| ClusterError::SnapshotUnavailable(e.to_string()))?;
        Ok(MergedRegistry::from_snapshot(snapshot))
    }

    /// Metrics of the whole fleet.
    ///
    /// In single-process mode this is the local registry and nothing is
    /// sent. In cluster mode every online sibling is asked for its snapshot
    /// and the snapshots are merged.
    ///
    /// # Errors
    ///
    /// - `Timeout`, `IdentityUnavailable`, `DirectoryUnavailable`,
    ///   `RequestInFlight`, `ChannelClosed` from the collector, unchanged
    /// - `InvalidSnapshot` if any reply payload is not a snapshot
    pub async fn get_aggregate_metrics(
        &self,
        timeout: Option<Duration>,
    ) -> Result<MergedRegistry, ClusterError> {
        let collector = match &self.mode {
            Mode::Single => return self.local_registry(),
            Mode::Cluster(collector) => collector,
        };

        let timeout = timeout.unwrap_or(self.default_timeout);
        let replies = collector.collect(METRICS_GET_TOPIC, timeout).await?;

        let snapshots = replies
            .into_iter()
            .map(decode_snapshot)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(processes = snapshots.len(), "Merging fleet snapshots");
        Ok(merge_snapshots(&snapshots, &self.policy))
    }
}

fn decode_snapshot(reply: ProcessPacket) -> Result<MetricsSnapshot, ClusterError> {
    let sender_id = reply.sender_id;
    MetricsSnapshot::from_value(reply.payload).map_err(|e| ClusterError::InvalidSnapshot {
        sender_id,
        reason: e.to_string(),
    })
}
