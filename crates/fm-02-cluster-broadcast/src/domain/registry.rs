//! In-flight topic registry.
//!
//! A process may have only one outstanding request per topic. Registration
//! is an RAII guard: dropping it releases the topic.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Topics with an outstanding request in this process.
#[derive(Debug, Default)]
pub struct InFlightTopics {
    topics: Mutex<HashSet<String>>,
}

impl InFlightTopics {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `topic`.
    ///
    /// Returns `None` if the topic is already claimed.
    pub fn try_register(self: &Arc<Self>, topic: &str) -> Option<TopicRegistration> {
        if !self.topics.lock().insert(topic.to_string()) {
            return None;
        }

        debug!(topic = %topic, "Registered in-flight topic");
        Some(TopicRegistration {
            registry: Arc::clone(self),
            topic: topic.to_string(),
        })
    }

    /// Returns true if `topic` is claimed.
    pub fn is_in_flight(&self, topic: &str) -> bool {
        self.topics.lock().contains(topic)
    }

    /// Number of claimed topics.
    pub fn len(&self) -> usize {
        self.topics.lock().len()
    }

    /// Returns true if no topic is claimed.
    pub fn is_empty(&self) -> bool {
        self.topics.lock().is_empty()
    }
}

/// Claim on one topic; released on drop.
#[derive(Debug)]
pub struct TopicRegistration {
    registry: Arc<InFlightTopics>,
    topic: String,
}

impl TopicRegistration {
    /// The claimed topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for TopicRegistration {
    fn drop(&mut self) {
        self.registry.topics.lock().remove(&self.topic);
        debug!(topic = %self.topic, "Released in-flight topic");
    }
}
