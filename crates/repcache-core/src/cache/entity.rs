use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::CacheEntry;

/// In-memory store of the most recent successfully fetched value per key.
///
/// There is no expiry. Entries leave only through `clear`, `clear_all`, or
/// replacement by `set`. One instance per entity family.
pub struct EntityCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    generation: AtomicU64,
}

impl<T: Clone> EntityCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.read().get(key).cloned()
    }

    /// Store `value` under `key`, replacing any previous entry whole.
    pub fn set(&self, key: &str, value: T) {
        self.write().insert(key.to_string(), CacheEntry::new(key, value));
    }

    /// Store `value` only if no `clear_all` happened since `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn set_if_generation(&self, generation: u64, key: &str, value: T) -> bool {
        let mut entries = self.write();
        // Checked under the write lock so a concurrent clear_all can't slip in between
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key, "Dropping result fetched before cache was cleared");
            return false;
        }
        entries.insert(key.to_string(), CacheEntry::new(key, value));
        true
    }

    pub fn clear(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn clear_all(&self) {
        let mut entries = self.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    /// Advanced by every `clear_all`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl<T: Clone> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EntityCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EntityCache")
            .field("keys", &entries.keys().collect::<Vec<_>>())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_none() {
        let cache: EntityCache<u32> = EntityCache::new();
        assert!(cache.get("routine:1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let cache = EntityCache::new();
        cache.set("routine:1|routineEdits=0", "push day".to_string());

        let entry = cache.get("routine:1|routineEdits=0").unwrap();
        assert_eq!(entry.value, "push day");
        assert_eq!(entry.key, "routine:1|routineEdits=0");
    }

    #[test]
    fn test_set_replaces_whole_entry() {
        let cache = EntityCache::new();
        cache.set("k", vec![1, 2, 3]);
        cache.set("k", vec![4]);
        assert_eq!(cache.get("k").unwrap().value, vec![4]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_removes_only_that_key() {
        let cache = EntityCache::new();
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").unwrap().value, 2);
    }

    #[test]
    fn test_clear_all_empties_and_advances_generation() {
        let cache = EntityCache::new();
        cache.set("a", 1);
        cache.set("b", 2);
        let before = cache.generation();

        cache.clear_all();

        assert!(cache.is_empty());
        assert_eq!(cache.generation(), before + 1);
    }

    #[test]
    fn test_set_if_generation_rejects_after_clear_all() {
        let cache = EntityCache::new();
        let generation = cache.generation();
        cache.clear_all();

        assert!(!cache.set_if_generation(generation, "a", 1));
        assert!(cache.get("a").is_none());

        assert!(cache.set_if_generation(cache.generation(), "a", 2));
        assert_eq!(cache.get("a").unwrap().value, 2);
    }
}
