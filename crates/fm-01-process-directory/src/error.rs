//! Error types for the process supervisor port

use thiserror::Error;

/// Errors reported by a process supervisor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("Supervisor unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}
