//! Namespace Table Module
//!
//! Two-level map from namespace to key to entry, shared by both local stores.
//! Namespaces are created on first write and dropped once they are empty.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::CacheEntry;

type Namespace<H> = HashMap<Vec<u8>, CacheEntry<H>>;

// == Namespace Table ==
#[derive(Debug)]
pub(crate) struct NamespaceTable<H> {
    namespaces: HashMap<Vec<u8>, Namespace<H>>,
    next_generation: u64,
}

impl<H> Default for NamespaceTable<H> {
    fn default() -> Self {
        Self {
            namespaces: HashMap::new(),
            next_generation: 0,
        }
    }
}

impl<H> NamespaceTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the generation for the next write.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        self.next_generation
    }

    // == Get ==
    /// Returns a copy of the value if present and not past its deadline.
    pub fn get(&self, namespace: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        self.namespaces
            .get(namespace)?
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    // == Insert ==
    /// Inserts a value, dropping (and so cancelling) any previous entry.
    ///
    /// # Arguments
    /// * `namespace` - Namespace to write into
    /// * `key` - Entry key
    /// * `value` - Bytes to store
    /// * `ttl` - Time to live
    /// * `generation` - Generation reserved with `next_generation`
    /// * `timer` - Expiry timer already scheduled for this generation
    pub fn insert(
        &mut self,
        namespace: &[u8],
        key: &[u8],
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
        timer: H,
    ) {
        let entry = CacheEntry::new(value, ttl, generation, timer);
        self.namespaces
            .entry(namespace.to_vec())
            .or_default()
            .insert(key.to_vec(), entry);
    }

    // == Remove ==
    /// Removes a key, returning whether it was present.
    pub fn remove(&mut self, namespace: &[u8], key: &[u8]) -> bool {
        self.remove_where(namespace, key, |_| true)
    }

    /// Removes a key only if it still holds the given generation.
    ///
    /// This is what a firing timer calls: if the key was overwritten or
    /// cleared in the meantime the call is a no-op.
    pub fn remove_if_generation(&mut self, namespace: &[u8], key: &[u8], generation: u64) -> bool {
        self.remove_where(namespace, key, |entry| entry.generation == generation)
    }

    fn remove_where(
        &mut self,
        namespace: &[u8],
        key: &[u8],
        predicate: impl FnOnce(&CacheEntry<H>) -> bool,
    ) -> bool {
        let Some(entries) = self.namespaces.get_mut(namespace) else {
            return false;
        };
        let matches = entries.get(key).map_or(false, predicate);
        let removed = matches && entries.remove(key).is_some();
        if entries.is_empty() {
            self.namespaces.remove(namespace);
        }
        removed
    }

    // == Clear ==
    /// Drops every entry of a namespace, cancelling their timers.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self, namespace: &[u8]) -> usize {
        self.namespaces
            .remove(namespace)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    // == Size ==
    /// Counts entries that are not past their deadline.
    pub fn live_len(&self, namespace: &[u8]) -> usize {
        self.namespaces
            .get(namespace)
            .map(|entries| entries.values().filter(|entry| !entry.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    pub fn total_entries(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }
}
