//! Reply Correlator
//!
//! Broadcasts a request and collects the replies that answer it.
//!
//! Flow:
//! 1. Claim the topic in `InFlightTopics` (one outstanding request per topic)
//! 2. Subscribe to the inbox
//! 3. Broadcast; the returned count is the number of replies expected
//! 4. Offer every inbound packet to the `PendingRequest` until it resolves
//!    or the deadline elapses
//!
//! Replies are matched by topic. Once a request resolves or times out its
//! subscription is gone, so late replies are dropped.

use fleet_telemetry::metrics::{self, outcome};
use fm_01_process_directory::ProcessDirectory;
use shared_bus::ProcessChannel;
use shared_types::{ClusterError, ProcessPacket};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{InFlightTopics, OfferOutcome, PendingRequest};
use crate::service::Broadcaster;

/// Correlates broadcast requests with their replies.
pub struct ReplyCorrelator<C: ProcessChannel, D: ProcessDirectory> {
    broadcaster: Broadcaster<C, D>,
    in_flight: Arc<InFlightTopics>,
}

impl<C: ProcessChannel, D: ProcessDirectory> ReplyCorrelator<C, D> {
    /// Create a correlator around `broadcaster`.
    pub fn new(broadcaster: Broadcaster<C, D>) -> Self {
        Self {
            broadcaster,
            in_flight: InFlightTopics::new(),
        }
    }

    /// The broadcaster used for the outbound leg.
    pub fn broadcaster(&self) -> &Broadcaster<C, D> {
        &self.broadcaster
    }

    /// Returns true if a request for `topic` is outstanding.
    pub fn is_in_flight(&self, topic: &str) -> bool {
        self.in_flight.is_in_flight(topic)
    }

    /// Broadcast `topic` and wait for a reply from every targeted sibling.
    ///
    /// Replies are returned in arrival order. With no siblings the call
    /// resolves immediately with no replies.
    ///
    /// # Errors
    ///
    /// - `RequestInFlight` if this process already awaits `topic`
    /// - `IdentityUnavailable` / `DirectoryUnavailable` from the broadcast
    /// - `Timeout` if not every reply arrived within `timeout`; partial
    ///   replies are discarded
    /// - `ChannelClosed` if the inbox shut down while waiting
    pub async fn await_replies(
        &self,
        topic: &str,
        timeout: Duration,
    ) -> Result<Vec<ProcessPacket>, ClusterError> {
        let deadline = Instant::now() + timeout;
        let request_id = Uuid::now_v7();

        let Some(_registration) = self.in_flight.try_register(topic) else {
            warn!(topic = %topic, request_id = %request_id, "Request already in flight");
            metrics::record_correlator_outcome(outcome::IN_FLIGHT);
            return Err(ClusterError::RequestInFlight(topic.to_string()));
        };

        let mut inbox = self.broadcaster.channel().subscribe();

        let expected = match self.broadcaster.broadcast(topic).await {
            Ok(expected) => expected,
            Err(e) => {
                metrics::record_correlator_outcome(outcome::ERROR);
                return Err(e);
            }
        };

        let mut pending = PendingRequest::new(request_id, topic, expected);
        debug!(
            topic = %topic,
            request_id = %request_id,
            expected,
            timeout_ms = timeout.as_millis() as u64,
            "Awaiting replies"
        );

        while pending.is_awaiting() {
            match timeout_at(deadline, inbox.recv()).await {
                Ok(Some(packet)) => {
                    let sender_id = packet.sender_id;
                    match pending.offer(packet) {
                        OfferOutcome::Ignored => {}
                        OfferOutcome::Duplicate => {
                            debug!(
                                topic = %topic,
                                request_id = %request_id,
                                sender_id = %sender_id,
                                "Ignoring duplicate reply"
                            );
                        }
                        OfferOutcome::Accepted | OfferOutcome::Completed => {
                            metrics::record_reply_collected();
                            debug!(
                                topic = %topic,
                                request_id = %request_id,
                                sender_id = %sender_id,
                                received = pending.received(),
                                expected,
                                "Reply collected"
                            );
                        }
                    }
                }
                Ok(None) => {
                    warn!(topic = %topic, request_id = %request_id, "Inbox closed while awaiting replies");
                    metrics::record_correlator_outcome(outcome::ERROR);
                    return Err(ClusterError::ChannelClosed);
                }
                Err(_) => {
                    let received = pending.expire();
                    warn!(
                        topic = %topic,
                        request_id = %request_id,
                        expected,
                        received,
                        "Timed out awaiting replies"
                    );
                    metrics::record_correlator_outcome(outcome::TIMEOUT);
                    return Err(ClusterError::Timeout {
                        topic: topic.to_string(),
                        expected,
                        received,
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
            }
        }

        metrics::record_correlator_outcome(outcome::RESOLVED);
        info!(
            topic = %topic,
            request_id = %request_id,
            expected,
            "All replies received"
        );

        Ok(pending.into_replies())
    }
}
