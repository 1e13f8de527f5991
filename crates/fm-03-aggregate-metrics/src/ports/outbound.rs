//! Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_types::{ClusterError, ProcessPacket};
use std::time::Duration;

/// Broadcasts a request and collects every sibling's reply.
#[async_trait]
pub trait ReplyCollector: Send + Sync {
    /// All replies to a `topic` broadcast, or an error.
    async fn collect(&self, topic: &str, timeout: Duration)
        -> Result<Vec<ProcessPacket>, ClusterError>;
}
