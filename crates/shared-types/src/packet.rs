//! # `ProcessPacket` Envelope
//!
//! The wire envelope for every message exchanged between sibling processes.
//!
//! ## Wire Contract
//!
//! Packets travel as JSON objects with camelCase field names:
//!
//! ```text
//! { "topic": "metrics-get", "senderId": 1, "payload": null,
//!   "isReply": false, "replyTo": 1, "originId": 1 }
//! ```
//!
//! Field names and semantics must stay byte-for-byte compatible with other
//! implementations of the protocol.
//!
//! ## Request/Reply Rules
//!
//! - A request has `isReply == false` and names its reply destination in `replyTo`.
//! - A reply has `isReply == true`, echoes the request `topic`, carries the
//!   replying process in `senderId` and keeps `originId` unchanged.

use crate::errors::ClusterError;
use crate::process::ProcessId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic of the cluster-wide metrics request.
pub const METRICS_GET_TOPIC: &str = "metrics-get";

/// The envelope exchanged between processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPacket {
    /// Logical request name. Replies echo the request topic.
    pub topic: String,

    /// The process that most recently sent this packet. Set on every hop.
    pub sender_id: ProcessId,

    /// Request-specific data. `null` for requests, a snapshot for replies.
    #[serde(default)]
    pub payload: Value,

    /// Distinguishes a reply from a request.
    #[serde(default)]
    pub is_reply: bool,

    /// Process that should receive the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ProcessId>,

    /// Process that originated the broadcast. Never rewritten.
    pub origin_id: ProcessId,
}

impl ProcessPacket {
    /// Build a broadcast request originating from `origin`.
    ///
    /// `reply_to` is set to the origin so repliers know where to return.
    pub fn request(topic: impl Into<String>, origin: ProcessId) -> Self {
        Self {
            topic: topic.into(),
            sender_id: origin,
            payload: Value::Null,
            is_reply: false,
            reply_to: Some(origin),
            origin_id: origin,
        }
    }

    /// Returns true if this is a request for `topic`.
    #[must_use]
    pub fn is_request_for(&self, topic: &str) -> bool {
        !self.is_reply && self.topic == topic
    }

    /// Returns true if this is a reply for `topic`.
    #[must_use]
    pub fn is_reply_for(&self, topic: &str) -> bool {
        self.is_reply && self.topic == topic
    }

    /// Build the reply to this request, answered by `responder`.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::MissingReplyTarget` if the request does not say
    /// where the reply should go.
    pub fn reply(&self, responder: ProcessId, payload: Value) -> Result<Self, ClusterError> {
        let target = self
            .reply_to
            .ok_or_else(|| ClusterError::MissingReplyTarget {
                topic: self.topic.clone(),
                sender_id: self.sender_id,
            })?;

        Ok(Self {
            topic: self.topic.clone(),
            sender_id: responder,
            payload,
            is_reply: true,
            reply_to: Some(target),
            origin_id: self.origin_id,
        })
    }

    /// Rewrite the sender for the next hop.
    #[must_use]
    pub fn forwarded_by(mut self, sender: ProcessId) -> Self {
        self.sender_id = sender;
        self
    }

    /// Encode as a single JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Fails only if the payload contains values JSON cannot represent.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a packet from JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error for malformed or incomplete packets.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
