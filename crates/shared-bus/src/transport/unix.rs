//! # Unix Socket Transport
//!
//! Each process listens on `<dir>/<app-name>-<process-id>.sock`. A packet is
//! sent by connecting to the target's socket and writing one JSON line.
//!
//! Malformed lines are logged and dropped; they never reach subscribers. A
//! line longer than [`MAX_PACKET_LINE`] closes the connection it came on.

use crate::channel::{ChannelError, ProcessChannel};
use crate::subscription::PacketSubscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ProcessId, ProcessPacket};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Back-off after a failed `accept`.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Longest packet line accepted or sent, newline included.
pub const MAX_PACKET_LINE: usize = 4 * 1024 * 1024;

/// Socket path of process `id` of application `name`.
#[must_use]
pub fn socket_path(dir: &Path, name: &str, id: ProcessId) -> PathBuf {
    dir.join(format!("{name}-{id}.sock"))
}

/// Extract the process id from a socket file name of application `name`.
///
/// Returns `None` for files that belong to another application or are not
/// sockets of this transport.
#[must_use]
pub fn parse_socket_file_name(file_name: &str, name: &str) -> Option<ProcessId> {
    file_name
        .strip_prefix(name)?
        .strip_prefix('-')?
        .strip_suffix(".sock")?
        .parse()
        .ok()
}

/// `ProcessChannel` over Unix domain sockets.
pub struct UnixSocketChannel {
    id: ProcessId,
    name: String,
    dir: PathBuf,
    path: PathBuf,
    inbound: broadcast::Sender<ProcessPacket>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    packets_sent: AtomicU64,
}

impl UnixSocketChannel {
    /// Bind the inbox of process `id` and start accepting packets.
    ///
    /// A stale socket file left by a crashed predecessor is replaced.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Bind` if the directory cannot be created or the
    /// socket cannot be bound.
    pub async fn bind(
        dir: impl Into<PathBuf>,
        name: impl Into<String>,
        id: ProcessId,
    ) -> Result<Self, ChannelError> {
        let dir = dir.into();
        let name = name.into();
        let path = socket_path(&dir, &name, id);

        let bind_error = |reason: String| ChannelError::Bind {
            path: path.display().to_string(),
            reason,
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| bind_error(e.to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed stale socket"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(bind_error(e.to_string())),
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_error(e.to_string()))?;
        let (inbound, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        let accept_task = tokio::spawn(accept_loop(listener, inbound.clone(), id));

        info!(process = %id, path = %path.display(), "Listening for sibling packets");

        Ok(Self {
            id,
            name,
            dir,
            path,
            inbound,
            accept_task: Mutex::new(Some(accept_task)),
            packets_sent: AtomicU64::new(0),
        })
    }

    /// Path of the local socket.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total send attempts from this channel.
    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    /// Stop accepting packets and remove the socket file.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let Some(task) = self.accept_task.lock().take() else {
            return;
        };
        task.abort();

        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove socket");
            }
        }
        debug!(process = %self.id, "Unix socket channel shut down");
    }
}

impl Drop for UnixSocketChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl ProcessChannel for UnixSocketChannel {
    fn local_id(&self) -> ProcessId {
        self.id
    }

    async fn send(&self, target: ProcessId, packet: ProcessPacket) -> Result<(), ChannelError> {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);

        let mut line = packet
            .to_json()
            .map_err(|e| ChannelError::Encode(e.to_string()))?;
        line.push('\n');
        if line.len() > MAX_PACKET_LINE {
            return Err(ChannelError::Encode(format!(
                "packet of {} bytes exceeds the {MAX_PACKET_LINE} byte limit",
                line.len()
            )));
        }

        let path = socket_path(&self.dir, &self.name, target);
        let mut stream = UnixStream::connect(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ChannelError::UnknownProcess(target),
                ErrorKind::ConnectionRefused => ChannelError::NoListener(target),
                _ => io_error(target, &e),
            })?;

        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| io_error(target, &e))?;
        stream.shutdown().await.map_err(|e| io_error(target, &e))?;

        debug!(target = %target, topic = %packet.topic, "Packet sent");
        Ok(())
    }

    fn subscribe(&self) -> PacketSubscription {
        PacketSubscription::new(self.inbound.subscribe(), self.id)
    }
}

fn io_error(target: ProcessId, e: &std::io::Error) -> ChannelError {
    ChannelError::Io {
        target,
        reason: e.to_string(),
    }
}

async fn accept_loop(
    listener: UnixListener,
    inbound: broadcast::Sender<ProcessPacket>,
    owner: ProcessId,
) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                tokio::spawn(read_packets(stream, inbound.clone(), owner, MAX_PACKET_LINE));
            }
            Err(e) => {
                warn!(process = %owner, error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn read_packets(
    stream: UnixStream,
    inbound: broadcast::Sender<ProcessPacket>,
    owner: ProcessId,
    max_line: usize,
) {
    let limit = u64::try_from(max_line).unwrap_or(u64::MAX);
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    loop {
        line.clear();
        match (&mut reader).take(limit).read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(process = %owner, error = %e, "Failed to read from connection");
                break;
            }
        }

        if line.len() >= max_line && line.last() != Some(&b'\n') {
            warn!(process = %owner, limit = max_line, "Packet line too long, closing connection");
            break;
        }

        let Ok(text) = std::str::from_utf8(&line) else {
            warn!(process = %owner, "Dropping packet that is not UTF-8");
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        match ProcessPacket::from_json(text) {
            Ok(packet) => {
                if inbound.send(packet).is_err() {
                    debug!(process = %owner, "Packet dropped, no subscriber");
                }
            }
            Err(e) => {
                warn!(process = %owner, error = %e, "Dropping malformed packet");
            }
        }
    }
}
