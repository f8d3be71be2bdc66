//! A bounded cache used for the word-decode cache (§4.2), the entry cache
//! (§4.6), and the small bisection-position cache (§4.6). No crate in this
//! corpus provides an LRU cache, so this is hand-rolled rather than borrowed.
//!
//! Eviction is "approximate LRU": each entry carries a logical timestamp
//! updated on access, and a full eviction is a linear scan for the oldest
//! timestamp. Capacities here are small (a few thousand entries at most), so
//! the O(n) eviction scan is cheap relative to the I/O it avoids.

use std::collections::HashMap;
use std::hash::Hash;

pub struct Cache<K, V> {
    capacity: usize,
    clock: u64,
    entries: HashMap<K, (V, u64)>,
}

impl<K: Eq + Hash + Clone, V: Clone> Cache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        self.clock += 1;
        let clock = self.clock;
        let found = self.entries.get_mut(key);
        found.map(|(value, seen)| {
            *seen = clock;
            value.clone()
        })
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.clock += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(key, (value, self.clock));
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, (_, seen))| *seen)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest_key);
        }
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
    fn evicts_when_over_capacity() {
        let mut cache: Cache<u32, u32> = Cache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        assert_eq!(cache.get(&1), Some(10));
        cache.insert(3, 30);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn overwriting_a_key_does_not_grow_past_capacity() {
        let mut cache: Cache<u32, u32> = Cache::new(1);
        cache.insert(1, 1);
        cache.insert(1, 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&1), Some(2));
    }
}
