//! Domain layer: identity and configuration.

pub mod config;
pub mod identity;

pub use config::{ClusterConfig, ExecMode};
pub use identity::ProcessIdentity;
