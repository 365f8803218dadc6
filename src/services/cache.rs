//! TTL and size-bounded memo in front of a durable store.
//!
//! [`GenericCache`] mirrors typed values read from a [`KeyValueStore`].
//! Reads are served from memory while a record is younger than the TTL;
//! writes always go straight through to the store and refresh the memo.
//! When the memo grows past its maximum size, the older half (by last touch)
//! is dropped on the next insert.
//!
//! Domain caches ([`UsageCounter`](super::usage::UsageCounter),
//! [`SettingsCache`](super::settings::SettingsCache),
//! [`FaviconCache`](super::favicon::FaviconCache)) wrap one of these.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::JumpResult;
use crate::services::storage::KeyValueStore;

/// Source of wall-clock milliseconds for record timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// One memoized value.
#[derive(Debug, Clone)]
pub struct CacheRecord<T> {
    pub key: String,
    pub data: T,
    pub timestamp_ms: u64,
    /// Monotonic touch order, breaks timestamp ties during eviction.
    touched: u64,
}

pub struct GenericCache<T> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    memo: HashMap<String, CacheRecord<T>>,
    ttl: Duration,
    max_entries: usize,
    touches: u64,
}

impl<T> GenericCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        config: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            memo: HashMap::new(),
            ttl: config.ttl(),
            max_entries: config.max_entries.max(2),
            touches: 0,
        }
    }

    /// Read `key`.
    ///
    /// With `use_cache`, a memo younger than the TTL is returned as is.
    /// Otherwise the store is read (missing keys yield `default`) and the
    /// result is memoized with the current timestamp.
    pub fn get(&mut self, key: &str, default: T, use_cache: bool) -> JumpResult<T> {
        let now = self.clock.now_ms();

        if use_cache {
            if let Some(record) = self.memo.get(key) {
                let age = now.saturating_sub(record.timestamp_ms);
                if u128::from(age) < self.ttl.as_millis() {
                    debug!(key, age_ms = age, "cache hit");
                    return Ok(record.data.clone());
                }
            }
        }

        let value = match self.store.get(key)? {
            Some(raw) => serde_json::from_value(raw)?,
            None => default,
        };
        debug!(key, "cache read-through");

        self.memoize(key, value.clone(), now);
        Ok(value)
    }

    /// Write `value` through to the store and refresh its memo.
    pub fn set(&mut self, key: &str, value: T) -> JumpResult<()> {
        self.store.set(key, serde_json::to_value(&value)?)?;
        let now = self.clock.now_ms();
        self.memoize(key, value, now);
        Ok(())
    }

    /// Drop the memo for `key`; the next read goes to the store.
    pub fn invalidate(&mut self, key: &str) {
        self.memo.remove(key);
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }

    pub fn peek(&self, key: &str) -> Option<&CacheRecord<T>> {
        self.memo.get(key)
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn memoize(&mut self, key: &str, data: T, now: u64) {
        self.touches += 1;
        self.memo.insert(
            key.to_string(),
            CacheRecord {
                key: key.to_string(),
                data,
                timestamp_ms: now,
                touched: self.touches,
            },
        );
        self.prune_if_oversized();
    }

    /// Drop the older half of the memo once it exceeds `max_entries`.
    fn prune_if_oversized(&mut self) {
        if self.memo.len() <= self.max_entries {
            return;
        }

        let mut by_age: Vec<(u64, u64, String)> = self
            .memo
            .values()
            .map(|r| (r.timestamp_ms, r.touched, r.key.clone()))
            .collect();
        by_age.sort_unstable();

        let evict = by_age.len() / 2;
        for (_, _, key) in by_age.into_iter().take(evict) {
            self.memo.remove(&key);
        }

        debug!(evicted = evict, remaining = self.memo.len(), "pruned cache memo");
    }
}
