//! Usage counting with optimistic retry.
//!
//! Each [`UsageCounter::increment`] writes the whole usage map back through
//! the cache and then re-reads it from the durable store to verify the write
//! landed. A mismatch means something else touched the store in between, so
//! the increment is retried with exponential backoff:
//!
//! ```text
//! delay(retry) = base_delay × 2^retry      (10ms, 20ms, 40ms by default)
//! ```
//!
//! After `max_retries` failed verifications the call fails with
//! [`JumpError::UsageConflict`]; it never returns a count it could not verify.
//! Backoff waits on a tokio timer, so the calling task yields instead of
//! blocking, and dropping the future cancels the remaining attempts.
//!
//! Other code may write to the same key. Counts that are not non-negative
//! integers are dropped when read, so a bad value costs its entry's boost
//! instead of failing every search.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{CacheConfig, UsageConfig};
use crate::core::entry::UsageMap;
use crate::error::{JumpError, JumpResult};
use crate::services::cache::GenericCache;
use crate::services::storage::KeyValueStore;

/// Store key holding the serialized [`UsageMap`].
pub const USAGE_KEY: &str = "usage_counts";

/// The usage map as stored, decoded leniently.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct StoredUsage(pub UsageMap);

impl<'de> Deserialize<'de> for StoredUsage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(sanitize_usage(Value::deserialize(deserializer)?)))
    }
}

fn sanitize_usage(raw: Value) -> UsageMap {
    match raw {
        Value::Object(entries) => entries
            .into_iter()
            .filter_map(|(id, count)| match count.as_u64() {
                Some(n) => Some((id, n)),
                None => {
                    warn!(id = %id, value = %count, "dropping invalid usage count");
                    None
                }
            })
            .collect(),
        Value::Null => UsageMap::new(),
        other => {
            warn!(value = %other, "stored usage is not a map, ignoring it");
            UsageMap::new()
        }
    }
}

pub struct UsageCounter {
    cache: GenericCache<StoredUsage>,
    max_retries: u32,
    base_delay: Duration,
}

impl UsageCounter {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache_config: &CacheConfig,
        usage_config: &UsageConfig,
    ) -> Self {
        Self::from_cache(GenericCache::new(store, cache_config), usage_config)
    }

    pub fn from_cache(cache: GenericCache<StoredUsage>, usage_config: &UsageConfig) -> Self {
        Self {
            cache,
            max_retries: usage_config.max_retries,
            base_delay: usage_config.base_delay(),
        }
    }

    /// The current usage map, served from the memo while fresh.
    pub fn usage_map(&mut self) -> JumpResult<UsageMap> {
        Ok(self.cache.get(USAGE_KEY, StoredUsage::default(), true)?.0)
    }

    fn read_through(&mut self) -> JumpResult<UsageMap> {
        Ok(self.cache.get(USAGE_KEY, StoredUsage::default(), false)?.0)
    }

    pub fn count(&mut self, id: &str) -> JumpResult<u64> {
        Ok(self.usage_map()?.get(id).copied().unwrap_or(0))
    }

    /// Backoff before retry number `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Increment the usage count for `id`, returning the verified new count.
    pub async fn increment(&mut self, id: &str) -> JumpResult<u64> {
        let mut retries = 0;

        loop {
            let mut usage = self.read_through()?;
            let next = usage
                .get(id)
                .copied()
                .unwrap_or(0)
                .checked_add(1)
                .ok_or_else(|| JumpError::UsageOverflow(id.to_string()))?;
            usage.insert(id.to_string(), next);
            self.cache.set(USAGE_KEY, StoredUsage(usage))?;

            let stored = self.read_through()?;
            if stored.get(id) == Some(&next) {
                debug!(id, count = next, retries, "usage incremented");
                return Ok(next);
            }

            if retries >= self.max_retries {
                warn!(id, retries, "usage increment could not be verified");
                return Err(JumpError::UsageConflict {
                    id: id.to_string(),
                    retries,
                });
            }

            let delay = self.delay_for_retry(retries);
            warn!(
                id,
                expected = next,
                found = ?stored.get(id),
                retry = retries + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "usage write was overwritten, retrying"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }

    /// Forget the usage of `id`.
    pub fn reset(&mut self, id: &str) -> JumpResult<()> {
        let mut usage = self.read_through()?;
        if usage.remove(id).is_some() {
            self.cache.set(USAGE_KEY, StoredUsage(usage))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStore;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Store that lets another "writer" bump a count right after each of
    /// the first `interference` usage writes.
    struct RacingStore {
        inner: MemoryStore,
        interference: AtomicU32,
        bump: u64,
    }

    impl RacingStore {
        fn new(interference: u32, bump: u64) -> Self {
            Self {
                inner: MemoryStore::new(),
                interference: AtomicU32::new(interference),
                bump,
            }
        }
    }

    impl KeyValueStore for RacingStore {
        fn get(&self, key: &str) -> JumpResult<Option<Value>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, mut value: Value) -> JumpResult<()> {
            let racing = key == USAGE_KEY
                && self
                    .interference
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            if racing {
                if let Some(map) = value.as_object_mut() {
                    for count in map.values_mut() {
                        *count = json!(count.as_u64().unwrap_or(0) + self.bump);
                    }
                }
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> JumpResult<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> JumpResult<Vec<String>> {
            self.inner.keys()
        }
    }

    fn counter(store: Arc<dyn KeyValueStore>) -> UsageCounter {
        UsageCounter::new(store, &CacheConfig::default(), &UsageConfig::default())
    }

    #[test]
    fn test_delay_for_retry() {
        let counter = counter(Arc::new(MemoryStore::new()));
        assert_eq!(counter.delay_for_retry(0), Duration::from_millis(10));
        assert_eq!(counter.delay_for_retry(1), Duration::from_millis(20));
        assert_eq!(counter.delay_for_retry(2), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_sequential_increments() {
        let store = Arc::new(MemoryStore::new());
        let mut counter = counter(store.clone());

        for expected in 1..=5 {
            assert_eq!(counter.increment("gh").await.unwrap(), expected);
        }
        assert_eq!(counter.count("gh").unwrap(), 5);
        assert_eq!(counter.count("other").unwrap(), 0);
        assert_eq!(store.get(USAGE_KEY).unwrap(), Some(json!({"gh": 5})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_single_race() {
        let store = Arc::new(RacingStore::new(1, 1));
        let mut counter = counter(store);

        let started = tokio::time::Instant::now();
        // The racing writer's bump is kept and our increment lands on top.
        assert_eq!(counter.increment("gh").await.unwrap(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_after_three_retries() {
        let store = Arc::new(RacingStore::new(u32::MAX, 1));
        let mut counter = counter(store.clone());

        let started = tokio::time::Instant::now();
        let err = counter.increment("gh").await.unwrap_err();

        assert!(matches!(
            err,
            JumpError::UsageConflict { ref id, retries: 3 } if id == "gh"
        ));
        assert_eq!(started.elapsed(), Duration::from_millis(70));
        // One initial attempt plus three retries.
        assert_eq!(store.interference.load(Ordering::SeqCst), u32::MAX - 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_is_cancellable() {
        let store = Arc::new(RacingStore::new(u32::MAX, 1));
        let mut counter = counter(store.clone());

        let result =
            tokio::time::timeout(Duration::from_millis(15), counter.increment("gh")).await;
        assert!(result.is_err());
        // Cancelled during the second backoff, before a third attempt.
        assert_eq!(store.interference.load(Ordering::SeqCst), u32::MAX - 2);
    }

    #[tokio::test]
    async fn test_invalid_counts_are_dropped() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(USAGE_KEY, json!({"a": -1, "b": 2, "c": 1.5, "d": "many"}))
            .unwrap();
        let mut counter = counter(store.clone());

        let usage = counter.usage_map().unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage.get("b"), Some(&2));

        assert_eq!(counter.increment("a").await.unwrap(), 1);
        assert_eq!(store.get(USAGE_KEY).unwrap(), Some(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_non_map_usage_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(USAGE_KEY, json!([1, 2, 3])).unwrap();
        assert!(counter(store).usage_map().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_increment_at_max_count_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set(USAGE_KEY, json!({"a": u64::MAX})).unwrap();
        let mut counter = counter(store.clone());

        let err = counter.increment("a").await.unwrap_err();
        assert!(matches!(err, JumpError::UsageOverflow(ref id) if id == "a"));
        assert_eq!(store.get(USAGE_KEY).unwrap(), Some(json!({"a": u64::MAX})));
    }

    #[tokio::test]
    async fn test_reset() {
        let mut counter = counter(Arc::new(MemoryStore::new()));
        counter.increment("a").await.unwrap();
        counter.increment("b").await.unwrap();
        counter.reset("a").unwrap();

        let usage = counter.usage_map().unwrap();
        assert_eq!(usage.get("a"), None);
        assert_eq!(usage.get("b"), Some(&1));
    }
}
