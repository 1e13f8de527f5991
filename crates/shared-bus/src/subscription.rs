//! # Packet Subscription
//!
//! The receiving side of a process inbox.

use crate::channel::ChannelError;
use shared_types::{ProcessId, ProcessPacket};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A subscription handle for inbound packets.
///
/// When dropped, the subscription is automatically removed from the inbox,
/// so packets arriving afterwards are no longer observed by this handle.
pub struct PacketSubscription {
    /// The broadcast receiver over the process inbox.
    receiver: broadcast::Receiver<ProcessPacket>,

    /// Process that owns the inbox (for logging).
    owner: ProcessId,
}

impl PacketSubscription {
    /// Create a new subscription.
    pub fn new(receiver: broadcast::Receiver<ProcessPacket>, owner: ProcessId) -> Self {
        Self { receiver, owner }
    }

    /// Receive the next inbound packet.
    ///
    /// # Returns
    ///
    /// - `Some(packet)` - The next packet
    /// - `None` - The inbox was closed
    pub async fn recv(&mut self) -> Option<ProcessPacket> {
        loop {
            match self.receiver.recv().await {
                Ok(packet) => return Some(packet),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        owner = %self.owner,
                        lagged = count,
                        "Subscriber lagged, inbound packets dropped"
                    );
                }
            }
        }
    }

    /// Try to receive the next packet without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(packet))` - A packet was available
    /// - `Ok(None)` - Nothing queued right now
    /// - `Err(ChannelError::NoListener)` - The inbox was closed
    pub fn try_recv(&mut self) -> Result<Option<ProcessPacket>, ChannelError> {
        loop {
            match self.receiver.try_recv() {
                Ok(packet) => return Ok(Some(packet)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(ChannelError::NoListener(self.owner))
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    /// Process that owns the inbox.
    #[must_use]
    pub fn owner(&self) -> ProcessId {
        self.owner
    }
}

impl Drop for PacketSubscription {
    fn drop(&mut self) {
        debug!(owner = %self.owner, "Packet subscription dropped");
    }
}
