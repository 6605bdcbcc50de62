//! Duplicate detection for inbound events. The in-memory cache is a latency
//! optimization only; the durable store's uniqueness constraint is the
//! authority, so a restart that clears the cache never loses dedup state.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use sara_core::domain::interaction::EventId;
use sara_db::{InteractionRepository, RepositoryError};

/// Insertion-ordered set with a hard capacity. Inserting past capacity
/// evicts the oldest member.
#[derive(Debug)]
pub struct BoundedIdCache {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl BoundedIdCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::with_capacity(capacity.max(1)),
            members: HashSet::with_capacity(capacity.max(1)),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn insert(&mut self, id: &str) {
        if self.members.contains(id) {
            return;
        }
        if self.members.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(id.to_owned());
        self.members.insert(id.to_owned());
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

pub struct IdempotencyGuard {
    cache: Mutex<BoundedIdCache>,
    store: Arc<dyn InteractionRepository>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn InteractionRepository>, cache_capacity: usize) -> Self {
        Self { cache: Mutex::new(BoundedIdCache::new(cache_capacity)), store }
    }

    fn cache(&self) -> MutexGuard<'_, BoundedIdCache> {
        match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// True when a record with this event_id already exists. The cache only
    /// short-circuits the durable lookup; a miss always consults the store.
    pub async fn seen(&self, event_id: &EventId) -> Result<bool, RepositoryError> {
        if self.cache().contains(event_id.as_str()) {
            return Ok(true);
        }

        let durable = self.store.exists(event_id).await?;
        if durable {
            self.cache().insert(event_id.as_str());
        }
        Ok(durable)
    }

    /// Record a terminal event_id in the fast path. Called only once the
    /// interaction reached completed or failed.
    pub fn mark(&self, event_id: &EventId) {
        self.cache().insert(event_id.as_str());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use sara_core::domain::interaction::{EventId, InteractionRecord};
    use sara_core::ChannelType;
    use sara_db::{InMemoryInteractionRepository, InteractionRepository};

    use super::{BoundedIdCache, IdempotencyGuard};

    #[test]
    fn cache_evicts_oldest_entry_at_capacity() {
        let mut cache = BoundedIdCache::new(2);
        cache.insert("a");
        cache.insert("b");
        cache.insert("c");

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn reinserting_a_member_does_not_grow_or_evict() {
        let mut cache = BoundedIdCache::new(2);
        cache.insert("a");
        cache.insert("a");
        cache.insert("b");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
    }

    #[tokio::test]
    async fn unseen_event_is_not_seen() {
        let store = Arc::new(InMemoryInteractionRepository::new());
        let guard = IdempotencyGuard::new(store, 16);

        assert!(!guard.seen(&EventId("sms_SM1".to_owned())).await.expect("seen"));
    }

    #[tokio::test]
    async fn durable_store_is_authoritative_when_cache_is_cold() {
        let store = Arc::new(InMemoryInteractionRepository::new());
        let event_id = EventId("sms_SM1".to_owned());
        store
            .insert_processing(&InteractionRecord::processing(
                event_id.clone(),
                ChannelType::Sms,
                serde_json::json!({}),
                Utc::now(),
            ))
            .await
            .expect("insert");

        // Fresh guard: simulates a restart that wiped the cache.
        let guard = IdempotencyGuard::new(store, 16);
        assert!(guard.seen(&event_id).await.expect("seen"));
        // Second lookup is served from the now-warm cache.
        assert!(guard.seen(&event_id).await.expect("seen again"));
    }

    #[tokio::test]
    async fn marked_event_is_seen_without_a_durable_record() {
        let store = Arc::new(InMemoryInteractionRepository::new());
        let guard = IdempotencyGuard::new(store, 16);
        let event_id = EventId("whatsapp_wamid.9".to_owned());

        guard.mark(&event_id);
        assert!(guard.seen(&event_id).await.expect("seen"));
    }
}
