//! # Process Descriptors
//!
//! Identity and status of the processes managed by the supervisor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Numeric identity of a supervised process.
///
/// Serialized as a bare integer so the wire format stays compatible with
/// siblings that treat process ids as plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Wrap a raw process id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw process id.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for ProcessId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

/// Lifecycle status reported by the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessStatus {
    Online,
    Launching,
    Stopping,
    Stopped,
    Errored,
    OneLaunchStatus,
}

impl ProcessStatus {
    /// Returns true if the process is running and able to answer requests.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, ProcessStatus::Online)
    }
}

/// One entry of the supervisor's process table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// Process identity.
    pub id: ProcessId,
    /// Logical application name shared by all siblings.
    pub name: String,
    /// Current lifecycle status.
    pub status: ProcessStatus,
}

impl ProcessDescriptor {
    /// Create a descriptor.
    pub fn new(id: ProcessId, name: impl Into<String>, status: ProcessStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
        }
    }

    /// Shorthand for an online process.
    pub fn online(id: ProcessId, name: impl Into<String>) -> Self {
        Self::new(id, name, ProcessStatus::Online)
    }

    /// Returns true if this process is an online sibling of `name`.
    #[must_use]
    pub fn is_online_sibling_of(&self, name: &str) -> bool {
        self.status.is_online() && self.name == name
    }
}
