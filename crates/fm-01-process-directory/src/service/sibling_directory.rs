//! Sibling Directory
//!
//! Implements `ProcessDirectory` over any `ProcessSupervisor`.

use async_trait::async_trait;
use shared_types::{ClusterError, ProcessDescriptor, ProcessId};
use tracing::debug;

use crate::domain::ProcessIdentity;
use crate::ports::{ProcessDirectory, ProcessSupervisor};

/// Directory of the current process and its online siblings.
pub struct SiblingDirectory<S: ProcessSupervisor> {
    /// Process supervisor (driven port)
    supervisor: S,
    /// Who we are
    identity: ProcessIdentity,
}

impl<S: ProcessSupervisor> SiblingDirectory<S> {
    /// Create a directory for `identity` backed by `supervisor`.
    pub fn new(supervisor: S, identity: ProcessIdentity) -> Self {
        Self {
            supervisor,
            identity,
        }
    }

    /// The underlying supervisor.
    pub fn supervisor(&self) -> &S {
        &self.supervisor
    }

    /// The current process identity.
    pub fn identity(&self) -> &ProcessIdentity {
        &self.identity
    }
}

#[async_trait]
impl<S: ProcessSupervisor> ProcessDirectory for SiblingDirectory<S> {
    fn process_name(&self) -> &str {
        &self.identity.name
    }

    fn current_process_id(&self) -> Result<ProcessId, ClusterError> {
        self.identity.process_id()
    }

    async fn list_siblings(&self) -> Result<Vec<ProcessDescriptor>, ClusterError> {
        let processes = self
            .supervisor
            .list_processes()
            .await
            .map_err(|e| ClusterError::DirectoryUnavailable(e.to_string()))?;

        let total = processes.len();
        let mut siblings: Vec<ProcessDescriptor> = processes
            .into_iter()
            .filter(|process| process.is_online_sibling_of(&self.identity.name))
            .collect();
        siblings.sort_by_key(|process| process.id);

        debug!(
            name = %self.identity.name,
            total,
            siblings = siblings.len(),
            "Resolved sibling processes"
        );

        Ok(siblings)
    }
}
