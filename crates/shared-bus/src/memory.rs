//! # In-Memory Process Bus
//!
//! Simulates a fleet of processes inside one runtime. Each process id gets a
//! mailbox; `InMemoryEndpoint` is the `ProcessChannel` a simulated process
//! uses to talk to the others.

use crate::channel::{ChannelError, ProcessChannel};
use crate::subscription::PacketSubscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{ProcessId, ProcessPacket};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Hub holding one mailbox per simulated process.
pub struct InMemoryProcessBus {
    /// Mailbox senders by process id.
    mailboxes: RwLock<HashMap<ProcessId, broadcast::Sender<ProcessPacket>>>,

    /// Total send attempts, delivered or not.
    packets_sent: AtomicU64,

    /// Mailbox capacity.
    capacity: usize,
}

impl InMemoryProcessBus {
    /// Create a new bus with default mailbox capacity.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new bus with the given mailbox capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            mailboxes: RwLock::new(HashMap::new()),
            packets_sent: AtomicU64::new(0),
            capacity,
        })
    }

    /// Get the endpoint for process `id`, creating its mailbox if needed.
    pub fn endpoint(self: &Arc<Self>, id: ProcessId) -> InMemoryEndpoint {
        let inbox = {
            let mut mailboxes = self.mailboxes.write();
            mailboxes
                .entry(id)
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .clone()
        };

        InMemoryEndpoint {
            id,
            bus: Arc::clone(self),
            inbox,
        }
    }

    /// Remove a process from the bus, as if it crashed.
    ///
    /// Later sends to it fail with `ChannelError::UnknownProcess`.
    pub fn disconnect(&self, id: ProcessId) -> bool {
        let removed = self.mailboxes.write().remove(&id).is_some();
        if removed {
            debug!(process = %id, "Process disconnected from bus");
        }
        removed
    }

    /// Deliver a packet to the mailbox of `target`.
    pub fn deliver(&self, target: ProcessId, packet: ProcessPacket) -> Result<(), ChannelError> {
        // Always increment counter (send was attempted)
        self.packets_sent.fetch_add(1, Ordering::Relaxed);

        let Some(mailbox) = self.mailboxes.read().get(&target).cloned() else {
            return Err(ChannelError::UnknownProcess(target));
        };

        match mailbox.send(packet) {
            Ok(receivers) => {
                debug!(target = %target, receivers, "Packet delivered");
                Ok(())
            }
            Err(_) => Err(ChannelError::NoListener(target)),
        }
    }

    /// Total number of send attempts on this bus.
    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    /// Number of processes with a mailbox.
    #[must_use]
    pub fn process_count(&self) -> usize {
        self.mailboxes.read().len()
    }
}

/// A simulated process's view of the bus.
#[derive(Clone)]
pub struct InMemoryEndpoint {
    id: ProcessId,
    bus: Arc<InMemoryProcessBus>,
    inbox: broadcast::Sender<ProcessPacket>,
}

impl InMemoryEndpoint {
    /// The bus this endpoint belongs to.
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryProcessBus> {
        &self.bus
    }
}

#[async_trait]
impl ProcessChannel for InMemoryEndpoint {
    fn local_id(&self) -> ProcessId {
        self.id
    }

    async fn send(&self, target: ProcessId, packet: ProcessPacket) -> Result<(), ChannelError> {
        self.bus.deliver(target, packet)
    }

    fn subscribe(&self) -> PacketSubscription {
        PacketSubscription::new(self.inbox.subscribe(), self.id)
    }
}
