//! `ReplyCollector` over the cluster broadcast correlator.

use async_trait::async_trait;
use fm_01_process_directory::ProcessDirectory;
use fm_02_cluster_broadcast::ReplyCorrelator;
use shared_bus::ProcessChannel;
use shared_types::{ClusterError, ProcessPacket};
use std::time::Duration;

use crate::ports::ReplyCollector;

#[async_trait]
impl<C: ProcessChannel, D: ProcessDirectory> ReplyCollector for ReplyCorrelator<C, D> {
    async fn collect(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Vec<ProcessPacket>, ClusterError> {
        self.await_replies(topic, timeout).await
    }
}
