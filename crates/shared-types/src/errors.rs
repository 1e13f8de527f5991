//! # Error Types
//!
//! The error taxonomy of the cluster broadcast/reply protocol.

use crate::process::ProcessId;
use thiserror::Error;

/// Errors surfaced by the cluster protocol.
///
/// None of these are retried internally; they reach the caller of the
/// aggregate query unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// The runtime has not been given a process identity.
    #[error("Process identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// The supervisor could not enumerate processes.
    #[error("Process directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Fewer replies than expected arrived before the deadline.
    #[error("Timed out after {timeout_ms} ms waiting for '{topic}' replies ({received}/{expected} received)")]
    Timeout {
        topic: String,
        expected: usize,
        received: usize,
        timeout_ms: u64,
    },

    /// An inbound request carried no process to reply to.
    #[error("Request '{topic}' from process {sender_id} has no reply target")]
    MissingReplyTarget { topic: String, sender_id: ProcessId },

    /// A request for this topic is already outstanding in this process.
    #[error("A request for topic '{0}' is already in flight")]
    RequestInFlight(String),

    /// The inbound side of the message channel shut down.
    #[error("Inbound message channel closed")]
    ChannelClosed,

    /// A reply payload could not be decoded as a metrics snapshot.
    #[error("Invalid snapshot from process {sender_id}: {reason}")]
    InvalidSnapshot { sender_id: ProcessId, reason: String },

    /// The local metrics registry could not be captured.
    #[error("Local metrics snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// A request handler failed to compute its answer.
    #[error("Handler for '{topic}' failed: {reason}")]
    HandlerFailed { topic: String, reason: String },
}

impl ClusterError {
    /// Returns true for the expected "a sibling did not answer in time" failure.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Timeout { .. })
    }
}
