use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

use crate::models::cache::{CacheEntry, CacheKey, ValidityTag};
use crate::services::api::ApiError;
use crate::services::store::{KeyValueStore, StoreError};

/// Staleness-tagged snapshots over a durable key/value store.
///
/// Screens never touch the entries directly; they go through `read`,
/// `read_if_valid`, `write` and the composite `fetch_with_cache`.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Pure lookup; never touches the network.
    ///
    /// Storage or decode failures are logged and read as absent.
    pub fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(key.as_ref()) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Cache read failed, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Cache entry undecodable, treating as absent");
                None
            }
        }
    }

    /// Payload of the entry for `key` if its tag equals `expected`.
    pub fn read_if_valid<T: DeserializeOwned>(&self, key: CacheKey, expected: &ValidityTag) -> Option<T> {
        self.read::<T>(key)
            .filter(|entry| &entry.validity_tag == expected)
            .map(|entry| entry.payload)
    }

    /// Last-write-wins overwrite.
    pub fn write<T: Serialize>(&self, key: CacheKey, payload: &T, tag: &ValidityTag) -> Result<(), StoreError> {
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            validity_tag: tag.clone(),
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_string(&entry).map_err(StoreError::Serialize)?;
        self.store.set(key.as_ref(), raw)
    }

    /// Serve `key` from cache when the tag matches and `force_refresh` is
    /// false; otherwise call `remote_fetch` and store its result.
    ///
    /// A failed fetch leaves the previous entry in place and propagates the
    /// error. A failed write after a successful fetch is logged only.
    pub async fn fetch_with_cache<T, F, Fut>(
        &self,
        key: CacheKey,
        tag: &ValidityTag,
        force_refresh: bool,
        remote_fetch: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if !force_refresh {
            if let Some(payload) = self.read_if_valid::<T>(key, tag) {
                metrics::counter!("cache_hits_total", "key" => key.to_string()).increment(1);
                tracing::debug!(cache_key = %key, "Cache hit");
                return Ok(payload);
            }
        }

        metrics::counter!("cache_misses_total", "key" => key.to_string()).increment(1);
        tracing::debug!(cache_key = %key, force_refresh, "Fetching from backend");

        let payload = remote_fetch().await.map_err(|e| {
            tracing::warn!(cache_key = %key, error = %e, "Cache refresh failed, keeping previous entry");
            CacheError::RefreshFailed { key, source: e }
        })?;

        if let Err(e) = self.write(key, &payload, tag) {
            tracing::warn!(cache_key = %key, error = %e, "Cache write failed");
        }

        Ok(payload)
    }

    /// Reset all local state in one operation.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        tracing::info!("Clearing all local state");
        self.store.clear()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Refreshing {key} failed: {source}")]
    RefreshFailed {
        key: CacheKey,
        #[source]
        source: ApiError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cache::DayBucket;
    use crate::services::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn cache() -> CacheStore {
        CacheStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_write_then_read_if_valid_round_trip() {
        let cache = cache();
        let tag = ValidityTag::unconditional();
        let payload = vec!["a".to_string(), "b".to_string()];
        cache.write(CacheKey::History, &payload, &tag).unwrap();

        let read: Option<Vec<String>> = cache.read_if_valid(CacheKey::History, &tag);
        assert_eq!(read, Some(payload));
    }

    #[test]
    fn test_mismatched_tag_is_a_miss() {
        let cache = cache();
        let tag_b = ValidityTag::weather("福岡市", DayBucket::Today);
        let tag_a = ValidityTag::weather("福岡市", DayBucket::Tomorrow);
        cache.write(CacheKey::Weather, &42u32, &tag_b).unwrap();

        assert_eq!(cache.read_if_valid::<u32>(CacheKey::Weather, &tag_a), None);
        // The entry itself is still there for plain reads.
        let entry = cache.read::<u32>(CacheKey::Weather).unwrap();
        assert_eq!(entry.payload, 42);
        assert_eq!(entry.validity_tag, tag_b);
    }

    #[tokio::test]
    async fn test_fetch_skips_remote_on_hit() {
        let cache = cache();
        let tag = ValidityTag::unconditional();
        cache.write(CacheKey::Inventory, &1u32, &tag).unwrap();

        let calls = AtomicU32::new(0);
        let counter = &calls;
        let value = cache
            .fetch_with_cache(CacheKey::Inventory, &tag, false, || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(2u32)
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches_and_stores() {
        let cache = cache();
        let tag = ValidityTag::unconditional();
        cache.write(CacheKey::Inventory, &1u32, &tag).unwrap();

        let value = cache
            .fetch_with_cache(CacheKey::Inventory, &tag, true, || async { Ok(2u32) })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(cache.read_if_valid::<u32>(CacheKey::Inventory, &tag), Some(2));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_entry() {
        let cache = cache();
        let tag = ValidityTag::unconditional();
        cache.write(CacheKey::History, &1u32, &tag).unwrap();

        let result = cache
            .fetch_with_cache(CacheKey::History, &tag, true, || async {
                Err::<u32, _>(ApiError::Status { status: 503, message: "down".to_string() })
            })
            .await;

        assert!(matches!(result, Err(CacheError::RefreshFailed { key: CacheKey::History, .. })));
        assert_eq!(cache.read_if_valid::<u32>(CacheKey::History, &tag), Some(1));
    }

    #[test]
    fn test_clear_all() {
        let cache = cache();
        let tag = ValidityTag::unconditional();
        cache.write(CacheKey::History, &1u32, &tag).unwrap();
        cache.write(CacheKey::Inventory, &1u32, &tag).unwrap();
        cache.clear_all().unwrap();

        assert!(cache.read::<u32>(CacheKey::History).is_none());
        assert!(cache.read::<u32>(CacheKey::Inventory).is_none());
    }
}
