//! Settings persisted in the durable store, merged over defaults.
//!
//! Stored settings may predate fields added later, or carry only the keys a
//! settings form changed. Loading merges the stored JSON object over the
//! serialized `T::default()` key by key, so missing fields keep their
//! defaults and unknown fields are ignored by deserialization.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::CacheConfig;
use crate::error::JumpResult;
use crate::services::cache::GenericCache;
use crate::services::storage::KeyValueStore;

pub const SETTINGS_KEY: &str = "settings";

pub struct SettingsCache<T> {
    cache: GenericCache<Value>,
    key: String,
    _settings: PhantomData<T>,
}

impl<T> SettingsCache<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::from_cache(GenericCache::new(store, config), SETTINGS_KEY)
    }

    pub fn from_cache(cache: GenericCache<Value>, key: &str) -> Self {
        Self {
            cache,
            key: key.to_string(),
            _settings: PhantomData,
        }
    }

    /// Load settings, merged over defaults.
    ///
    /// A stored value that no longer deserializes is reported and replaced by
    /// defaults rather than failing the caller.
    pub fn load(&mut self) -> JumpResult<T> {
        let mut merged = serde_json::to_value(T::default())?;
        let stored = self.cache.get(&self.key, Value::Null, true)?;
        merge_json(&mut merged, stored);

        match serde_json::from_value(merged) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored settings are invalid, using defaults");
                Ok(T::default())
            }
        }
    }

    pub fn save(&mut self, settings: &T) -> JumpResult<()> {
        let value = serde_json::to_value(settings)?;
        self.cache.set(&self.key, value)
    }

    /// Merge a partial JSON object into the stored settings and save.
    pub fn update(&mut self, patch: Value) -> JumpResult<T> {
        let mut merged = serde_json::to_value(self.load()?)?;
        merge_json(&mut merged, patch);
        let settings: T = serde_json::from_value(merged)?;
        self.save(&settings)?;
        Ok(settings)
    }
}

/// Recursively overlay `overlay` onto `base`. Non-object overlays replace,
/// `null` leaves `base` untouched.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
