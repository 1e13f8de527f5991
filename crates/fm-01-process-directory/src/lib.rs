//! # FM-01 Process Directory
//!
//! Answers two questions for the cluster protocol: "who am I?" and "who are
//! my siblings?".
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): identity and environment configuration
//!   - `ClusterConfig`: execution mode, name, process id, socket directory
//!   - `ProcessIdentity`: logical name plus optional numeric id
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `ProcessDirectory`: Driving port used by the broadcaster
//!   - `ProcessSupervisor`: Driven port onto the process manager
//!
//! - **Service Layer** (`service/`): `SiblingDirectory` filters the
//!   supervisor's process table down to online processes sharing our name.
//!
//! - **Adapters Layer** (`adapters/`):
//!   - `StaticSupervisor`: in-memory process table
//!   - `SocketDirSupervisor`: derives the table from live inbox sockets
//!
//! ## Invariants
//!
//! - The current process is its own sibling: it is listed, receives its own
//!   broadcast and answers it.
//! - Supervisor failures surface as `DirectoryUnavailable`; nothing retries.
//!
//! ## Usage Example
//!
//! ```ignore
//! use fm_01_process_directory::{ClusterConfig, SiblingDirectory, StaticSupervisor};
//!
//! let config = ClusterConfig::from_env();
//! let directory = SiblingDirectory::new(StaticSupervisor::empty(), config.identity());
//! let siblings = directory.list_siblings().await?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::StaticSupervisor;
#[cfg(unix)]
pub use adapters::SocketDirSupervisor;
pub use domain::{ClusterConfig, ExecMode, ProcessIdentity};
pub use error::SupervisorError;
pub use ports::{ProcessDirectory, ProcessSupervisor};
pub use service::SiblingDirectory;
