//! The state cache shared across all driver connections.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Maximum entry count of the shared state cache: a ~100 MiB budget at
/// roughly 256 bytes per entry.
pub const MAX_GLOBAL_STATE_SIZE: usize = 100_000_000 / 256;

/// Prefix of prepared-query-id keys in state updates and attachments.
pub(crate) const PREPARED_QUERY_ID_ATTACHMENT_PREFIX: &str = "pqid/";

/// A bounded, thread-safe relay of the `state_updates` the server returns.
///
/// Entries are only ever written from server responses; the proxy never
/// invalidates them locally. Least-recently-used entries are evicted once
/// the bound is reached.
pub struct GlobalState {
    cache: Mutex<LruCache<String, String>>,
}

impl GlobalState {
    /// Creates a cache capping the item count to `size` (minimum 1).
    pub fn new(size: usize) -> Self {
        let capacity = NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN);
        GlobalState {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn store(&self, key: String, val: String) {
        self.cache.lock().unwrap().put(key, val);
    }

    /// Returns the cached value and promotes the entry on hit.
    pub fn load(&self, key: &str) -> Option<String> {
        self.cache.lock().unwrap().get(key).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        GlobalState::new(MAX_GLOBAL_STATE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_load() {
        let cache = GlobalState::default();
        cache.store("key1".to_owned(), "val1".to_owned());

        assert_eq!(cache.load("key1").as_deref(), Some("val1"));
        assert_eq!(cache.load("id3"), None);
    }

    #[test]
    fn lru_eviction() {
        let cache = GlobalState::new(2);
        cache.store("key1".to_owned(), "val1".to_owned());
        cache.store("key2".to_owned(), "val2".to_owned());
        cache.store("key3".to_owned(), "val3".to_owned());

        assert_eq!(cache.load("key1"), None);
        assert_eq!(cache.load("key2").as_deref(), Some("val2"));
        assert_eq!(cache.load("key3").as_deref(), Some("val3"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn load_promotes_entry() {
        let cache = GlobalState::new(2);
        cache.store("key1".to_owned(), "val1".to_owned());
        cache.store("key2".to_owned(), "val2".to_owned());

        // Touch key1, making key2 the eviction candidate.
        assert!(cache.load("key1").is_some());
        cache.store("key3".to_owned(), "val3".to_owned());

        assert_eq!(cache.load("key1").as_deref(), Some("val1"));
        assert_eq!(cache.load("key2"), None);
    }

    #[test]
    fn size_never_exceeds_bound() {
        let cache = GlobalState::new(8);
        for i in 0..100 {
            cache.store(format!("pqid/id{i}"), format!("hash{i}"));
            assert!(cache.len() <= 8);
        }
    }
}
