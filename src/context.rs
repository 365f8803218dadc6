//! The launcher context: one owner for every cache and engine.
//!
//! Nothing in the crate keeps process-wide state. A [`LauncherContext`] is
//! built over a store handle and owns the caches layered on it, so tests and
//! embedders can create as many isolated contexts as they like.

use std::sync::Arc;

use tracing::debug;

use crate::config::{Config, RankingConfig};
use crate::core::entry::{Entry, EntrySource, UsageMap};
use crate::core::search::SearchEngine;
use crate::error::JumpResult;
use crate::services::cache::{Clock, GenericCache, SystemClock};
use crate::services::favicon::FaviconCache;
use crate::services::settings::{SettingsCache, SETTINGS_KEY};
use crate::services::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use crate::services::tags::{self, TagSuggestion};
use crate::services::usage::UsageCounter;
use crate::services::virtual_list::{
    ScrollAlignment, VirtualItem, VirtualScrollManager, VisibleItem, VisibleRange,
};

pub struct LauncherContext {
    store: Arc<dyn KeyValueStore>,
    config: Config,
    engine: SearchEngine,
    usage: UsageCounter,
    favicons: FaviconCache,
    settings: SettingsCache<Config>,
    list: VirtualScrollManager<Entry>,
}

impl LauncherContext {
    pub fn new(store: Arc<dyn KeyValueStore>, config: Config) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, config: Config, clock: Arc<dyn Clock>) -> Self {
        let cache_config = &config.cache;
        Self {
            engine: SearchEngine::with_config(&config.ranking),
            usage: UsageCounter::from_cache(
                GenericCache::with_clock(store.clone(), cache_config, clock.clone()),
                &config.usage,
            ),
            favicons: FaviconCache::from_cache(GenericCache::with_clock(
                store.clone(),
                cache_config,
                clock.clone(),
            )),
            settings: SettingsCache::from_cache(
                GenericCache::with_clock(store.clone(), cache_config, clock),
                SETTINGS_KEY,
            ),
            list: VirtualScrollManager::new(&config.virtual_list),
            store,
            config,
        }
    }

    /// A context over a fresh in-memory store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// A context over the JSON file named by `config.storage`.
    pub fn open(config: Config) -> JumpResult<Self> {
        let store = JsonFileStore::open(config.storage.resolved_path())?;
        Ok(Self::new(Arc::new(store), config))
    }

    /// A context whose config comes from the settings saved in `store`,
    /// merged over defaults.
    pub fn from_stored_settings(store: Arc<dyn KeyValueStore>) -> JumpResult<Self> {
        let mut settings: SettingsCache<Config> =
            SettingsCache::new(store.clone(), &Config::default().cache);
        let mut config = settings.load()?;
        config.validate();
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Persist the current config as the stored settings.
    pub fn save_settings(&mut self) -> JumpResult<()> {
        self.settings.save(&self.config)
    }

    /// Swap in new ranking settings. The result list is left as is until
    /// the next search.
    pub fn set_ranking(&mut self, ranking: RankingConfig) {
        self.engine = SearchEngine::with_config(&ranking);
        self.config.ranking = ranking;
    }

    pub fn usage_map(&mut self) -> JumpResult<UsageMap> {
        self.usage.usage_map()
    }

    /// Rank the current snapshot for `query` and install it as the
    /// windowed result list. Returns the number of results.
    pub fn search<S>(&mut self, query: &str, source: &S) -> JumpResult<usize>
    where
        S: EntrySource + ?Sized,
    {
        let entries = source.list_entries()?;
        let usage = self.usage.usage_map()?;

        let items: Vec<VirtualItem<Entry>> = self
            .engine
            .rank(query, &entries, &usage)
            .into_iter()
            .map(|result| VirtualItem::new(result.entry.id.clone(), result.entry.clone()))
            .collect();

        let count = items.len();
        debug!(query, total = entries.len(), results = count, "search");
        self.list.set_items(items);
        Ok(count)
    }

    /// The full ranked list from the last search.
    pub fn results(&self) -> Vec<&Entry> {
        self.list.items().iter().map(|item| &item.payload).collect()
    }

    pub fn visible_range(&mut self, scroll_top: f64) -> Option<VisibleRange> {
        self.list.get_visible_range(scroll_top)
    }

    pub fn visible(&mut self, scroll_top: f64) -> Vec<VisibleItem<'_, Entry>> {
        self.list.get_visible_items(scroll_top)
    }

    pub fn scroll_to(&self, id: &str, alignment: ScrollAlignment) -> Option<f64> {
        self.list.scroll_to_item(id, alignment)
    }

    pub fn set_item_height(&mut self, id: &str, height: f64) -> bool {
        self.list.set_item_height(id, height)
    }

    pub fn set_container_height(&mut self, height: f64) {
        self.list.set_container_height(height);
    }

    /// Count a launch of `id`.
    pub async fn record_launch(&mut self, id: &str) -> JumpResult<u64> {
        self.usage.increment(id).await
    }

    /// Tag autocomplete for the current snapshot, narrowed by `partial`.
    pub fn tag_suggestions<S>(&self, source: &S, partial: &str) -> JumpResult<Vec<TagSuggestion>>
    where
        S: EntrySource + ?Sized,
    {
        let entries = source.list_entries()?;
        let all = tags::create_tag_suggestions(
            &tags::get_all_tags(&entries),
            &tags::count_tag_usage(&entries),
        );
        Ok(tags::filter_suggestions(&all, partial)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn favicon_for(&mut self, entry: &Entry) -> JumpResult<Option<String>> {
        self.favicons.lookup(entry)
    }

    pub fn remember_favicon(&mut self, host: &str, icon_url: &str) -> JumpResult<()> {
        self.favicons.set(host, icon_url)
    }
}
