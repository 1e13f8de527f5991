//! # Shared Types Crate
//!
//! This crate contains the types every Fleet Metrics crate agrees on:
//! the `ProcessPacket` wire envelope, the process descriptors reported by the
//! supervisor, and the `ClusterError` taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the wire contract between sibling processes is
//!   defined here and nowhere else.
//! - **Envelope Authority**: `sender_id` is rewritten on every hop; `origin_id`
//!   never changes and always names the process that started the broadcast.
//! - **Opaque Payloads**: the envelope never interprets `payload`.

pub mod errors;
pub mod packet;
pub mod process;

pub use errors::ClusterError;
pub use packet::{ProcessPacket, METRICS_GET_TOPIC};
pub use process::{ProcessDescriptor, ProcessId, ProcessStatus};
