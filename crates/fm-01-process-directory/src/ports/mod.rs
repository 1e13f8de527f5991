//! Ports Layer
//!
//! - Driving Ports (inbound) - API used by the cluster broadcaster
//! - Driven Ports (outbound) - Dependency on the process supervisor

pub mod inbound;
pub mod outbound;

pub use inbound::ProcessDirectory;
pub use outbound::ProcessSupervisor;
