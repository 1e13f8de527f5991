//! In-memory process table.
//!
//! Clones share the same table, so a test can keep a handle and change
//! process status while a directory is using it.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ProcessDescriptor, ProcessId, ProcessStatus};
use std::sync::Arc;

use crate::error::SupervisorError;
use crate::ports::ProcessSupervisor;

/// Supervisor backed by a mutable in-memory table.
#[derive(Clone, Default)]
pub struct StaticSupervisor {
    processes: Arc<RwLock<Vec<ProcessDescriptor>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl StaticSupervisor {
    /// Create a supervisor reporting `processes`.
    pub fn new(processes: Vec<ProcessDescriptor>) -> Self {
        Self {
            processes: Arc::new(RwLock::new(processes)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a supervisor with an empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a process or replace the entry with the same id.
    pub fn upsert(&self, process: ProcessDescriptor) {
        let mut processes = self.processes.write();
        match processes.iter_mut().find(|p| p.id == process.id) {
            Some(existing) => *existing = process,
            None => processes.push(process),
        }
    }

    /// Change the status of process `id`. Returns false if unknown.
    pub fn set_status(&self, id: ProcessId, status: ProcessStatus) -> bool {
        match self.processes.write().iter_mut().find(|p| p.id == id) {
            Some(process) => {
                process.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove process `id`. Returns false if unknown.
    pub fn remove(&self, id: ProcessId) -> bool {
        let mut processes = self.processes.write();
        let before = processes.len();
        processes.retain(|p| p.id != id);
        processes.len() != before
    }

    /// Make every query fail with `reason` until `recover` is called.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write() = Some(reason.into());
    }

    /// Stop failing queries.
    pub fn recover(&self) {
        *self.failure.write() = None;
    }
}

#[async_trait]
impl ProcessSupervisor for StaticSupervisor {
    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>, SupervisorError> {
        if let Some(reason) = self.failure.read().clone() {
            return Err(SupervisorError::Unavailable(reason));
        }
        Ok(self.processes.read().clone())
    }
}
