//! # FM-02 Cluster Broadcast
//!
//! The request/reply protocol between sibling processes.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): runtime-free state
//!   - `PendingRequest`: one outstanding broadcast, `Awaiting → Resolved | TimedOut`
//!   - `InFlightTopics`: at most one outstanding request per topic
//!
//! - **Service Layer** (`service/`):
//!   - `Broadcaster`: fans a request out to every online sibling
//!   - `ReplyCorrelator`: broadcasts, then collects the matching replies
//!   - `Responder`: answers sibling requests through `RequestHandler`s
//!
//! ## Flow
//!
//! ```text
//! ReplyCorrelator ──register topic──→ InFlightTopics
//!        │ subscribe inbox
//!        ↓
//!   Broadcaster ──request──→ sibling 1..n ──→ Responder ──reply──┐
//!        ↑                                                      │
//!        └────────────── PendingRequest::offer ←────────────────┘
//! ```
//!
//! ## Invariants
//!
//! - The inbox subscription is taken before the first send, so no reply is
//!   missed, including the process's own.
//! - Resolution is all-or-nothing: every expected reply, or `Timeout`.
//! - Each sender counts once per request.
//! - Dropping an `await_replies` future releases its topic.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod service;

#[cfg(test)]
mod testing;

pub use domain::{InFlightTopics, OfferOutcome, PendingRequest, PendingState, TopicRegistration};
pub use service::{Broadcaster, ReplyCorrelator, RequestHandler, Responder};
