pub mod cache;
pub mod favicon;
pub mod fuzzy;
pub mod pattern;
pub mod settings;
pub mod storage;
pub mod tags;
pub mod usage;
pub mod virtual_list;

pub use cache::{CacheRecord, Clock, GenericCache, ManualClock, SystemClock};
pub use favicon::FaviconCache;
pub use fuzzy::{fuzzy_score, FuzzyMatcher};
pub use pattern::{PatternSet, SafePattern};
pub use settings::SettingsCache;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use tags::{count_tag_usage, create_tag_suggestions, get_all_tags, TagSuggestion};
pub use usage::UsageCounter;
pub use virtual_list::{
    ItemStyle, ScrollAlignment, VirtualItem, VirtualScrollManager, VisibleItem, VisibleRange,
};
