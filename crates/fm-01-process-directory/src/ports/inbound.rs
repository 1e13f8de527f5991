//! Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::{ClusterError, ProcessDescriptor, ProcessId};
use std::sync::Arc;

/// Identity of the current process and its broadcast targets.
#[async_trait]
pub trait ProcessDirectory: Send + Sync {
    /// Logical name shared by all siblings.
    fn process_name(&self) -> &str;

    /// Numeric identity of the current process.
    ///
    /// Fails with `IdentityUnavailable` when the process runs outside the
    /// expected supervision model.
    fn current_process_id(&self) -> Result<ProcessId, ClusterError>;

    /// Online processes sharing our name, the current process included.
    ///
    /// Fails with `DirectoryUnavailable` if the supervisor cannot be queried.
    async fn list_siblings(&self) -> Result<Vec<ProcessDescriptor>, ClusterError>;
}

#[async_trait]
impl<T: ProcessDirectory + ?Sized> ProcessDirectory for Arc<T> {
    fn process_name(&self) -> &str {
        (**self).process_name()
    }

    fn current_process_id(&self) -> Result<ProcessId, ClusterError> {
        (**self).current_process_id()
    }

    async fn list_siblings(&self) -> Result<Vec<ProcessDescriptor>, ClusterError> {
        (**self).list_siblings().await
    }
}
