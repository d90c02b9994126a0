//! Striped per-key mutual exclusion
//!
//! A fixed array of mutexes is indexed by the key's hash, so memory stays
//! bounded while two different keys rarely contend. Guards must not be
//! nested: two keys landing on the same stripe would deadlock.

use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

/// Runs producers one at a time per key
#[derive(Debug)]
pub struct StripedProducerGuard {
    stripes: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl StripedProducerGuard {
    /// Create guard with `stripes` mutexes (at least one)
    #[must_use]
    pub fn new(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1)).map(|_| Mutex::new(())).collect();
        Self {
            stripes,
            hasher: RandomState::new(),
        }
    }

    /// Number of stripes
    #[inline]
    #[must_use]
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    /// Run `producer` while holding the stripe of `key`
    pub fn guard_by_key<K, T, F>(&self, key: &K, producer: F) -> T
    where
        K: Hash + ?Sized,
        F: FnOnce() -> T,
    {
        let index = self.stripe_index(key);
        let _held = self.stripes[index].lock();
        producer()
    }

    fn stripe_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        let hash = self.hasher.hash_one(key);
        (hash % self.stripes.len() as u64) as usize
    }
}
