//! Favicon URLs remembered per host.
//!
//! Discovery happens elsewhere; this only records what was found so the
//! renderer can show an icon without refetching.

use std::sync::Arc;

use crate::config::CacheConfig;
use crate::core::entry::Entry;
use crate::error::JumpResult;
use crate::services::cache::GenericCache;
use crate::services::storage::KeyValueStore;

const KEY_PREFIX: &str = "favicon:";

pub struct FaviconCache {
    cache: GenericCache<Option<String>>,
}

impl FaviconCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::from_cache(GenericCache::new(store, config))
    }

    pub fn from_cache(cache: GenericCache<Option<String>>) -> Self {
        Self { cache }
    }

    fn key(host: &str) -> String {
        format!("{KEY_PREFIX}{}", host.to_lowercase())
    }

    pub fn get(&mut self, host: &str) -> JumpResult<Option<String>> {
        self.cache.get(&Self::key(host), None, true)
    }

    pub fn set(&mut self, host: &str, icon_url: &str) -> JumpResult<()> {
        self.cache.set(&Self::key(host), Some(icon_url.to_string()))
    }

    /// Favicon for the host of `entry`'s url.
    pub fn lookup(&mut self, entry: &Entry) -> JumpResult<Option<String>> {
        match entry.host() {
            Some(host) => self.get(&host),
            None => Ok(None),
        }
    }

    /// Number of memoized hosts.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
