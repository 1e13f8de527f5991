//! Pending Request - the live state of one outstanding broadcast.
//!
//! ```text
//!            offer() reaches expected
//! Awaiting ───────────────────────────→ Resolved
//!     │
//!     └──────── expire() ─────────────→ TimedOut
//! ```
//!
//! A request expecting zero replies starts out `Resolved`. Each sender counts
//! once; a second reply from the same process is reported as `Duplicate` and
//! not collected.

use shared_types::{ProcessId, ProcessPacket};
use std::collections::HashSet;
use uuid::Uuid;

/// Lifecycle of a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// Still collecting replies.
    Awaiting,
    /// Every expected reply arrived.
    Resolved,
    /// The deadline elapsed first.
    TimedOut,
}

/// What happened to an offered packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Not a reply to this request, or the request is no longer awaiting.
    Ignored,
    /// The sender already replied to this request.
    Duplicate,
    /// Counted; more replies are needed.
    Accepted,
    /// Counted; this was the last expected reply.
    Completed,
}

/// One outstanding broadcast.
#[derive(Debug)]
pub struct PendingRequest {
    request_id: Uuid,
    topic: String,
    expected: usize,
    replies: Vec<ProcessPacket>,
    seen: HashSet<ProcessId>,
    state: PendingState,
}

impl PendingRequest {
    /// Start waiting for `expected` replies on `topic`.
    pub fn new(request_id: Uuid, topic: impl Into<String>, expected: usize) -> Self {
        let state = if expected == 0 {
            PendingState::Resolved
        } else {
            PendingState::Awaiting
        };

        Self {
            request_id,
            topic: topic.into(),
            expected,
            replies: Vec::with_capacity(expected),
            seen: HashSet::with_capacity(expected),
            state,
        }
    }

    /// Offer an inbound packet.
    pub fn offer(&mut self, packet: ProcessPacket) -> OfferOutcome {
        if self.state != PendingState::Awaiting || !packet.is_reply_for(&self.topic) {
            return OfferOutcome::Ignored;
        }
        if !self.seen.insert(packet.sender_id) {
            return OfferOutcome::Duplicate;
        }

        self.replies.push(packet);
        if self.replies.len() >= self.expected {
            self.state = PendingState::Resolved;
            OfferOutcome::Completed
        } else {
            OfferOutcome::Accepted
        }
    }

    /// Mark the request timed out and discard partial replies.
    ///
    /// Returns how many replies had arrived. No effect unless awaiting.
    pub fn expire(&mut self) -> usize {
        if self.state != PendingState::Awaiting {
            return self.replies.len();
        }

        let received = self.replies.len();
        self.replies.clear();
        self.state = PendingState::TimedOut;
        received
    }

    /// Request id used in log fields.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Topic being correlated.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Number of replies expected.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of replies collected so far.
    pub fn received(&self) -> usize {
        self.replies.len()
    }

    /// Current state.
    pub fn state(&self) -> PendingState {
        self.state
    }

    /// Returns true while replies are still being collected.
    pub fn is_awaiting(&self) -> bool {
        self.state == PendingState::Awaiting
    }

    /// Collected replies in arrival order.
    ///
    /// Empty unless the request resolved.
    pub fn into_replies(self) -> Vec<ProcessPacket> {
        match self.state {
            PendingState::Resolved => self.replies,
            PendingState::Awaiting | PendingState::TimedOut => Vec::new(),
        }
    }
}
