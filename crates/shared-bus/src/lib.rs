//! # Shared Bus - Inter-Process Message Channel
//!
//! Carries `ProcessPacket`s between sibling worker processes.
//!
//! ## Model
//!
//! ```text
//! ┌──────────────┐   send(target, packet)   ┌──────────────┐
//! │  Process 1   │ ───────────────────────→ │  Process 3   │
//! │              │                          │  inbox       │
//! │  subscribe() │ ←─────────────────────── │              │
//! └──────────────┘   send(origin, reply)    └──────────────┘
//! ```
//!
//! Every process owns one inbox. `subscribe()` hands out an independent
//! receiver over that inbox; dropping it unsubscribes.
//!
//! ## Delivery Semantics
//!
//! - **At-most-once:** no acknowledgement, no redelivery.
//! - **FIFO per sender**, unordered between senders.
//! - A failed send is reported to the caller, who decides whether it matters.
//!
//! ## Transports
//!
//! - `InMemoryProcessBus`: all "processes" live in one runtime (tests, demos).
//! - `UnixSocketChannel`: one socket per process, newline-delimited JSON.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod channel;
pub mod memory;
pub mod subscription;
pub mod transport;

// Re-export main types
pub use channel::{ChannelError, ProcessChannel};
pub use memory::{InMemoryEndpoint, InMemoryProcessBus};
pub use subscription::PacketSubscription;
#[cfg(unix)]
pub use transport::unix::UnixSocketChannel;

/// Maximum packets buffered per subscriber before older ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
