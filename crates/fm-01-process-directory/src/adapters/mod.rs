//! Adapters Layer
//!
//! Concrete `ProcessSupervisor` implementations.

pub mod static_supervisor;
#[cfg(unix)]
pub mod socket_dir;

pub use static_supervisor::StaticSupervisor;
#[cfg(unix)]
pub use socket_dir::SocketDirSupervisor;
