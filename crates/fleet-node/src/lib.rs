//! # Fleet Node Library
//!
//! Exposes the building blocks of the `fleet-node` binary for testing.
//!
//! - `config`: `NodeConfig` read from the environment
//! - `runtime`: `FleetNode`, wiring single-process or cluster services
//! - `server`: axum routes for the aggregate and local exposition
//! - `heartbeat`: uptime refresh on wall-clock boundaries

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod heartbeat;
pub mod runtime;
pub mod server;

pub use config::NodeConfig;
pub use heartbeat::Heartbeat;
pub use runtime::{FleetNode, MetricsService};
pub use server::router;
