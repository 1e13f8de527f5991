//! Responder
//!
//! Answers requests from sibling processes. One listener task per process
//! reads the inbox; every request whose topic has a registered
//! `RequestHandler` is answered in its own task with a reply sent to the
//! request's `reply_to` process, so a slow handler never holds up others.
//!
//! Failures never reach the requester: a request without a reply target, a
//! failing handler or a failed send are logged and counted, and the
//! requester times out.

use async_trait::async_trait;
use fleet_telemetry::metrics::{self, outcome};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared_bus::{PacketSubscription, ProcessChannel};
use shared_types::{ClusterError, ProcessId, ProcessPacket};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Computes the local answer to a request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Answer `request`. The returned value becomes the reply payload.
    async fn handle(&self, request: &ProcessPacket) -> Result<Value, ClusterError>;
}

struct ResponderInner<C> {
    channel: C,
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
}

/// Answers sibling requests.
pub struct Responder<C: ProcessChannel + 'static> {
    inner: Arc<ResponderInner<C>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<C: ProcessChannel + 'static> Responder<C> {
    /// Create a responder on `channel` with no handlers.
    pub fn new(channel: C) -> Self {
        Self {
            inner: Arc::new(ResponderInner {
                channel,
                handlers: RwLock::new(HashMap::new()),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Register `handler` for `topic` (builder form).
    #[must_use]
    pub fn with_handler(self, topic: impl Into<String>, handler: Arc<dyn RequestHandler>) -> Self {
        self.register_handler(topic, handler);
        self
    }

    /// Register `handler` for `topic`, replacing any previous handler.
    pub fn register_handler(&self, topic: impl Into<String>, handler: Arc<dyn RequestHandler>) {
        let topic = topic.into();
        if self
            .inner
            .handlers
            .write()
            .insert(topic.clone(), handler)
            .is_some()
        {
            debug!(topic = %topic, "Replaced request handler");
        }
    }

    /// Topics with a registered handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.handlers.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Process id replies are sent from.
    pub fn local_id(&self) -> ProcessId {
        self.inner.channel.local_id()
    }

    /// Start listening for requests.
    ///
    /// A listener that is already running is stopped first, so each request
    /// is answered once no matter how often this is called.
    pub fn start(&self) {
        let mut listener = self.listener.lock();
        if let Some(previous) = listener.take() {
            previous.abort();
            debug!(process = %self.local_id(), "Replaced running responder listener");
        }

        let inbox = self.inner.channel.subscribe();
        *listener = Some(tokio::spawn(listen(Arc::clone(&self.inner), inbox)));

        info!(process = %self.local_id(), topics = ?self.topics(), "Responder listening");
    }

    /// Stop listening. Returns false if the responder was not running.
    pub fn stop(&self) -> bool {
        match self.listener.lock().take() {
            Some(listener) => {
                listener.abort();
                info!(process = %self.local_id(), "Responder stopped");
                true
            }
            None => false,
        }
    }

    /// Returns true while the listener task is running.
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Answer one inbound packet.
    ///
    /// Returns the process the reply was sent to, or `None` if the packet
    /// needed no answer or the reply could not be delivered.
    ///
    /// # Errors
    ///
    /// - `MissingReplyTarget` if the request names no reply destination;
    ///   nothing is sent
    /// - `HandlerFailed` if the handler could not compute an answer
    pub async fn handle_packet(
        &self,
        packet: &ProcessPacket,
    ) -> Result<Option<ProcessId>, ClusterError> {
        self.inner.handle_packet(packet).await
    }
}

impl<C: ProcessChannel + 'static> Drop for Responder<C> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

impl<C: ProcessChannel> ResponderInner<C> {
    async fn handle_packet(
        &self,
        packet: &ProcessPacket,
    ) -> Result<Option<ProcessId>, ClusterError> {
        if packet.is_reply {
            return Ok(None);
        }

        let handler = self.handlers.read().get(&packet.topic).cloned();
        let Some(handler) = handler else {
            return Ok(None);
        };

        let Some(target) = packet.reply_to else {
            return Err(ClusterError::MissingReplyTarget {
                topic: packet.topic.clone(),
                sender_id: packet.sender_id,
            });
        };

        let payload = handler.handle(packet).await.map_err(|e| match e {
            ClusterError::HandlerFailed { .. } => e,
            other => ClusterError::HandlerFailed {
                topic: packet.topic.clone(),
                reason: other.to_string(),
            },
        })?;

        let reply = packet.reply(self.channel.local_id(), payload)?;

        match self.channel.send(target, reply).await {
            Ok(()) => {
                metrics::record_responder_outcome(outcome::SENT);
                debug!(
                    topic = %packet.topic,
                    target = %target,
                    origin = %packet.origin_id,
                    "Reply sent"
                );
                Ok(Some(target))
            }
            Err(e) => {
                metrics::record_responder_outcome(outcome::FAILED);
                warn!(
                    topic = %packet.topic,
                    target = %target,
                    error = %e,
                    "Failed to send reply"
                );
                Ok(None)
            }
        }
    }
}

async fn listen<C: ProcessChannel + 'static>(
    inner: Arc<ResponderInner<C>>,
    mut inbox: PacketSubscription,
) {
    // Dropping the set aborts requests still being answered.
    let mut in_progress = JoinSet::new();

    loop {
        tokio::select! {
            packet = inbox.recv() => {
                let Some(packet) = packet else { break };
                in_progress.spawn(answer(Arc::clone(&inner), packet));
            }
            Some(_) = in_progress.join_next(), if !in_progress.is_empty() => {}
        }
    }

    while in_progress.join_next().await.is_some() {}
    debug!("Responder inbox closed");
}

async fn answer<C: ProcessChannel>(inner: Arc<ResponderInner<C>>, packet: ProcessPacket) {
    match inner.handle_packet(&packet).await {
        Ok(_) => {}
        Err(e @ ClusterError::MissingReplyTarget { .. }) => {
            metrics::record_responder_outcome(outcome::MISSING_TARGET);
            warn!(
                topic = %packet.topic,
                sender_id = %packet.sender_id,
                error = %e,
                "Dropping malformed request"
            );
        }
        Err(e) => {
            metrics::record_responder_outcome(outcome::HANDLER_FAILED);
            warn!(
                topic = %packet.topic,
                sender_id = %packet.sender_id,
                error = %e,
                "Request handler failed"
            );
        }
    }
}
