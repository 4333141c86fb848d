// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Short-lived read cache for list endpoints.
//!
//! Entries expire after a fixed TTL and the whole cache is dropped on any
//! write to the underlying resource. No cross-instance consistency.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CachedList<V> {
    items: Arc<Vec<V>>,
    inserted_at: Instant,
}

/// TTL cache keyed by list filter.
pub struct ListCache<K, V> {
    entries: DashMap<K, CachedList<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V> ListCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh entry for `key`, if any. Expired entries are evicted on read.
    pub fn get(&self, key: &K) -> Option<Arc<Vec<V>>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.items.clone());
            }
        }
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl);
        None
    }

    pub fn insert(&self, key: K, items: Vec<V>) -> Arc<Vec<V>> {
        let items = Arc::new(items);
        self.entries.insert(
            key,
            CachedList {
                items: items.clone(),
                inserted_at: Instant::now(),
            },
        );
        items
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_then_invalidate() {
        let cache: ListCache<u8, &str> = ListCache::new(Duration::from_secs(30));
        cache.insert(1, vec!["Tikal"]);
        assert_eq!(cache.get(&1).unwrap().as_slice(), &["Tikal"]);
        assert!(cache.get(&2).is_none());

        cache.invalidate_all();
        assert!(cache.get(&1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache: ListCache<u8, i32> = ListCache::new(Duration::ZERO);
        cache.insert(1, vec![1, 2, 3]);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.len(), 0);
    }
}
