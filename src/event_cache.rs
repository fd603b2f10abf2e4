//! TTL-based event dedup cache.
//!
//! Inbound delivery channels retry: the same event can arrive more than
//! once within a short window. The cache answers one question, "have I
//! seen this event id recently", and is owned by the entry layer; the
//! discovery core never touches it.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;

pub struct EventCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, Instant>,
    // Insertion order, for oldest-first eviction
    order: VecDeque<String>,
}

impl EventCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Record an event id. Returns false when the id was already seen
    /// within the TTL, meaning the caller should drop the event.
    pub fn insert_if_absent(&mut self, event_id: &str) -> bool {
        let now = Instant::now();
        self.sweep(now);

        if self.entries.contains_key(event_id) {
            debug!(event_id, "duplicate event within ttl");
            return false;
        }

        while self.entries.len() >= self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.entries.insert(event_id.to_string(), now);
        self.order.push_back(event_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep(&mut self, now: Instant) {
        while let Some(front) = self.order.front() {
            let expired = match self.entries.get(front) {
                Some(inserted) => now.duration_since(*inserted) >= self.ttl,
                // Entry already evicted by the size bound
                None => true,
            };
            if !expired {
                break;
            }
            if let Some(front) = self.order.pop_front() {
                self.entries.remove(&front);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_within_ttl_is_rejected() {
        let mut cache = EventCache::new(Duration::from_secs(300), 16);
        assert!(cache.insert_if_absent("ev-1"));
        assert!(!cache.insert_if_absent("ev-1"));
        assert!(cache.insert_if_absent("ev-2"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entry_is_swept_and_readmitted() {
        let mut cache = EventCache::new(Duration::from_millis(0), 16);
        assert!(cache.insert_if_absent("ev-1"));
        // Zero TTL expires immediately, so the same id is fresh again
        assert!(cache.insert_if_absent("ev-1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_size_bound_evicts_oldest() {
        let mut cache = EventCache::new(Duration::from_secs(300), 2);
        assert!(cache.insert_if_absent("ev-1"));
        assert!(cache.insert_if_absent("ev-2"));
        assert!(cache.insert_if_absent("ev-3"));
        assert_eq!(cache.len(), 2);
        // ev-1 was evicted, so it no longer counts as a duplicate
        assert!(cache.insert_if_absent("ev-1"));
        assert!(!cache.insert_if_absent("ev-3"));
    }
}
