//! Process identity.

use shared_types::{ClusterError, ProcessId};

/// Who the current process is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    /// Logical name shared by all siblings.
    pub name: String,
    /// Numeric identity assigned by the supervisor, if any.
    pub id: Option<ProcessId>,
}

impl ProcessIdentity {
    /// Identity with a known process id.
    pub fn new(name: impl Into<String>, id: ProcessId) -> Self {
        Self {
            name: name.into(),
            id: Some(id),
        }
    }

    /// Identity of a process that was not given an id.
    pub fn unassigned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    /// The numeric id.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::IdentityUnavailable` if no id was assigned.
    pub fn process_id(&self) -> Result<ProcessId, ClusterError> {
        self.id.ok_or_else(|| {
            ClusterError::IdentityUnavailable(format!(
                "process '{}' was started without a process id",
                self.name
            ))
        })
    }
}
