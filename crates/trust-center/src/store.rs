//! The transport-id store abstraction and its in-memory implementation.
//!
//! The store holds `"tid:<transportId>" → pseudonym` associations with a TTL.
//! Multiple issuance requests race on key generation concurrently, so
//! correctness depends on `put_if_absent` being a true atomic
//! insert-if-absent-with-expiry primitive, not a check-then-set-then-expire
//! sequence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::{Duration, Instant};

/// The backing store could not be reached or failed an operation.
#[derive(Debug, thiserror::Error)]
#[error("transport-id store operation failed: {0}")]
pub struct StoreError(pub String);

/// TTL key-value store holding transport-id associations.
#[async_trait]
pub trait TransportIdStore: Send + Sync {
    /// Inserts `key → value` with the given TTL only if the key is absent, in
    /// one atomic step. Returns `false` without touching the existing entry
    /// when the key is occupied.
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Reads a key without consuming it.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Reads and invalidates a key in one step (single-use resolution).
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Removes the given keys, returning the count actually removed.
    async fn remove(&self, keys: &[String]) -> Result<usize, StoreError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// Mutex-guarded in-memory store. Expired entries count as absent and are
/// dropped lazily when their key is touched.
#[derive(Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransportIdStore for InMemoryStore {
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        if let Some(existing) = entries.get(key) {
            if !existing.is_expired() {
                return Ok(false);
            }
            entries.remove(key);
        }
        entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        match entries.remove(key) {
            Some(entry) if entry.is_expired() => Ok(None),
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired() {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn put_if_absent_never_overwrites() {
        let store = InMemoryStore::new();
        assert!(store.put_if_absent("tid:abc", "pseudo-1", TTL).await.expect("insert"));
        assert!(!store.put_if_absent("tid:abc", "pseudo-2", TTL).await.expect("insert"));
        assert_eq!(
            store.get("tid:abc").await.expect("get"),
            Some("pseudo-1".to_owned())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_count_as_absent() {
        let store = InMemoryStore::new();
        store.put_if_absent("tid:abc", "pseudo-1", TTL).await.expect("insert");

        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        assert_eq!(store.get("tid:abc").await.expect("get"), None);
        // The key is free for a fresh association again.
        assert!(store.put_if_absent("tid:abc", "pseudo-2", TTL).await.expect("insert"));
    }

    #[tokio::test]
    async fn take_is_single_use() {
        let store = InMemoryStore::new();
        store.put_if_absent("tid:abc", "pseudo-1", TTL).await.expect("insert");

        assert_eq!(
            store.take("tid:abc").await.expect("take"),
            Some("pseudo-1".to_owned())
        );
        assert_eq!(store.take("tid:abc").await.expect("take"), None);
        assert_eq!(store.get("tid:abc").await.expect("get"), None);
    }

    #[tokio::test]
    async fn remove_counts_only_live_entries() {
        let store = InMemoryStore::new();
        store.put_if_absent("tid:a", "p1", TTL).await.expect("insert");
        store.put_if_absent("tid:b", "p2", TTL).await.expect("insert");

        let keys = vec!["tid:a".to_owned(), "tid:b".to_owned(), "tid:missing".to_owned()];
        assert_eq!(store.remove(&keys).await.expect("remove"), 2);
        assert_eq!(store.get("tid:a").await.expect("get"), None);
    }
}
