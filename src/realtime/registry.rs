//! Subscription registry.
//!
//! Tracks the topics the application wants events for. A topic is either
//! *pending* (requested, not yet acknowledged) or *confirmed*
//! (`subscription-confirmed` received), never both. Both sets survive
//! reconnection and are replayed; only an explicit disconnect clears them.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::identifiers::TopicId;

// ============================================================================
// SubscriptionRegistry
// ============================================================================

#[derive(Debug, Default)]
struct Topics {
    pending: FxHashSet<TopicId>,
    confirmed: FxHashSet<TopicId>,
}

/// Set of subscribed topics.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    topics: Mutex<Topics>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the topic is pending or confirmed.
    #[must_use]
    pub fn contains(&self, topic_id: &TopicId) -> bool {
        let topics = self.topics.lock();
        topics.pending.contains(topic_id) || topics.confirmed.contains(topic_id)
    }

    /// Records a subscription request.
    ///
    /// Returns `false` if the topic was already known (no request needed).
    pub fn request(&self, topic_id: TopicId) -> bool {
        let mut topics = self.topics.lock();
        if topics.confirmed.contains(&topic_id) {
            return false;
        }
        topics.pending.insert(topic_id)
    }

    /// Moves a topic to the confirmed set.
    ///
    /// Acknowledgements for topics that were unsubscribed in the meantime
    /// are ignored, so an optimistic unsubscribe is never undone.
    pub fn confirm(&self, topic_id: &TopicId) -> bool {
        let mut topics = self.topics.lock();
        if topics.pending.remove(topic_id) {
            topics.confirmed.insert(topic_id.clone());
            true
        } else {
            if !topics.confirmed.contains(topic_id) {
                debug!(topic_id = %topic_id, "Ignoring confirmation for unknown topic");
            }
            false
        }
    }

    /// Removes a topic from both sets.
    ///
    /// Returns `true` if it was registered.
    pub fn remove(&self, topic_id: &TopicId) -> bool {
        let mut topics = self.topics.lock();
        let pending = topics.pending.remove(topic_id);
        let confirmed = topics.confirmed.remove(topic_id);
        pending || confirmed
    }

    /// Confirmed topics, sorted.
    #[must_use]
    pub fn confirmed(&self) -> Vec<TopicId> {
        let mut confirmed: Vec<TopicId> = self.topics.lock().confirmed.iter().cloned().collect();
        confirmed.sort();
        confirmed
    }

    /// Every topic to re-issue after a (re)connect.
    ///
    /// Nothing is removed: the registry is never empty during replay.
    #[must_use]
    pub fn replay_set(&self) -> Vec<TopicId> {
        let topics = self.topics.lock();
        topics
            .confirmed
            .iter()
            .chain(topics.pending.iter())
            .cloned()
            .collect()
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        let topics = self.topics.lock();
        topics.pending.len() + topics.confirmed.len()
    }

    /// Returns `true` if no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every topic.
    pub fn clear(&self) {
        let mut topics = self.topics.lock();
        topics.pending.clear();
        topics.confirmed.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
