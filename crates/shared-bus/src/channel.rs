//! # Process Channel
//!
//! The port every transport implements.

use crate::subscription::PacketSubscription;
use async_trait::async_trait;
use shared_types::{ProcessId, ProcessPacket};
use std::sync::Arc;
use thiserror::Error;

/// Errors from sending a packet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// No process with this id is reachable on the transport.
    #[error("Unknown process: {0}")]
    UnknownProcess(ProcessId),

    /// The target exists but nothing is listening on its inbox.
    #[error("Process {0} has no inbound listener")]
    NoListener(ProcessId),

    /// The packet could not be serialized.
    #[error("Failed to encode packet: {0}")]
    Encode(String),

    /// Transport I/O failed while talking to the target.
    #[error("I/O error talking to process {target}: {reason}")]
    Io { target: ProcessId, reason: String },

    /// The local inbox could not be set up.
    #[error("Failed to bind inbox at {path}: {reason}")]
    Bind { path: String, reason: String },
}

/// Send packets to a specific process and receive packets addressed to us.
///
/// Implementations must be `Send + Sync`; one channel is shared by the
/// broadcaster, the reply correlator and the responder of a process.
#[async_trait]
pub trait ProcessChannel: Send + Sync {
    /// The process this channel delivers inbound packets for.
    fn local_id(&self) -> ProcessId;

    /// Send a packet to `target`.
    ///
    /// Success means the transport accepted the packet, not that the target
    /// processed it.
    async fn send(&self, target: ProcessId, packet: ProcessPacket) -> Result<(), ChannelError>;

    /// Subscribe to inbound packets.
    ///
    /// Only packets arriving after this call are observed.
    fn subscribe(&self) -> PacketSubscription;
}

#[async_trait]
impl<T: ProcessChannel + ?Sized> ProcessChannel for Arc<T> {
    fn local_id(&self) -> ProcessId {
        (**self).local_id()
    }

    async fn send(&self, target: ProcessId, packet: ProcessPacket) -> Result<(), ChannelError> {
        (**self).send(target, packet).await
    }

    fn subscribe(&self) -> PacketSubscription {
        (**self).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_display() {
        assert_eq!(
            ChannelError::UnknownProcess(ProcessId::new(4)).to_string(),
            "Unknown process: 4"
        );
        assert_eq!(
            ChannelError::NoListener(ProcessId::new(2)).to_string(),
            "Process 2 has no inbound listener"
        );
    }
}
