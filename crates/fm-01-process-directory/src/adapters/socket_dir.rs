//! Process table derived from the socket directory.
//!
//! Every process binds `<dir>/<name>-<id>.sock`. A process whose socket
//! accepts a connection is `online`; a leftover socket file nobody listens on
//! belongs to a `stopped` process.

use async_trait::async_trait;
use shared_bus::transport::unix::parse_socket_file_name;
use shared_types::{ProcessDescriptor, ProcessStatus};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::SupervisorError;
use crate::ports::ProcessSupervisor;

/// Supervisor that scans a socket directory.
#[derive(Debug, Clone)]
pub struct SocketDirSupervisor {
    dir: PathBuf,
    name: String,
}

impl SocketDirSupervisor {
    /// Scan `dir` for sockets of application `name`.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    /// Directory being scanned.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ProcessSupervisor for SocketDirSupervisor {
    async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>, SupervisorError> {
        let io_error = |e: std::io::Error| SupervisorError::Io {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };

        let mut processes = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let file_name = entry.file_name();
            let Some(id) = file_name
                .to_str()
                .and_then(|f| parse_socket_file_name(f, &self.name))
            else {
                continue;
            };

            let status = match UnixStream::connect(entry.path()).await {
                Ok(_) => ProcessStatus::Online,
                Err(e) => {
                    debug!(process = %id, error = %e, "Socket not accepting connections");
                    ProcessStatus::Stopped
                }
            };
            processes.push(ProcessDescriptor::new(id, self.name.clone(), status));
        }

        Ok(processes)
    }
}
