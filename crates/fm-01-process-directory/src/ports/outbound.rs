//! Outbound Ports (Driven Ports)
//!
//! The process supervisor owns the authoritative process table.

use async_trait::async_trait;
use shared_types::ProcessDescriptor;

use crate::error::SupervisorError;

/// Process supervisor (Driven Port)
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Every process the supervisor knows about, in any status.
    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>, SupervisorError>;
}
