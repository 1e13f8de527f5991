//! Broadcaster
//!
//! Sends one request packet to every online sibling. Sends are best-effort:
//! a failed send is logged and counted, but still counts as targeted. A dead
//! sibling simply never replies and the correlator's deadline covers it.

use fleet_telemetry::metrics;
use fm_01_process_directory::ProcessDirectory;
use shared_bus::ProcessChannel;
use shared_types::{ClusterError, ProcessPacket};
use tracing::{debug, warn};

/// Fans a request out to the sibling processes.
pub struct Broadcaster<C: ProcessChannel, D: ProcessDirectory> {
    /// Message channel (driven port)
    channel: C,
    /// Sibling directory (driven port)
    directory: D,
}

impl<C: ProcessChannel, D: ProcessDirectory> Broadcaster<C, D> {
    /// Create a broadcaster sending over `channel` to the siblings in `directory`.
    pub fn new(channel: C, directory: D) -> Self {
        Self { channel, directory }
    }

    /// The message channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The sibling directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Send a `topic` request to every online sibling.
    ///
    /// Returns the number of siblings targeted, whether or not each send
    /// succeeded. Returns 0 without sending when there are no siblings.
    ///
    /// # Errors
    ///
    /// `IdentityUnavailable` or `DirectoryUnavailable` from the directory.
    pub async fn broadcast(&self, topic: &str) -> Result<usize, ClusterError> {
        let self_id = self.directory.current_process_id()?;
        let siblings = self.directory.list_siblings().await?;

        if siblings.is_empty() {
            debug!(topic = %topic, "No siblings online, nothing to broadcast");
            return Ok(0);
        }

        let packet = ProcessPacket::request(topic, self_id);
        let mut failed = 0;

        for sibling in &siblings {
            if let Err(e) = self.channel.send(sibling.id, packet.clone()).await {
                warn!(
                    topic = %topic,
                    target = %sibling.id,
                    error = %e,
                    "Broadcast send failed"
                );
                failed += 1;
            }
        }

        metrics::record_broadcast(siblings.len() - failed, failed);
        debug!(
            topic = %topic,
            origin = %self_id,
            targeted = siblings.len(),
            failed,
            "Broadcast sent"
        );

        Ok(siblings.len())
    }
}
