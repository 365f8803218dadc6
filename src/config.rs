use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::error::JumpResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ranking: RankingConfig,
    pub virtual_list: VirtualListConfig,
    pub cache: CacheConfig,
    pub usage: UsageConfig,
    pub storage: StorageConfig,
}

/// Scoring knobs for the ranking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Leading character that switches a query into tag-filter mode.
    pub tag_marker: char,
    /// Base score every entry gets for an empty query.
    pub empty_query_score: f64,
    pub usage_boost_cap: f64,
    pub usage_boost_scale: f64,
    pub max_results: Option<usize>,
    /// Host globs/regexes whose entries never appear in results.
    pub hidden_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualListConfig {
    pub estimated_item_height: f64,
    pub container_height: f64,
    pub overscan: usize,
    /// Width of the scroll offset buckets used to key the range cache.
    pub scroll_bucket: f64,
    pub range_cache_size: usize,
    pub max_height_overrides: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Self {
            ranking: RankingConfig::default(),
            virtual_list: VirtualListConfig::default(),
            cache: CacheConfig::default(),
            usage: UsageConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            tag_marker: '#',
            empty_query_score: 0.001,
            usage_boost_cap: 8.0,
            usage_boost_scale: 3.0,
            max_results: None,
            hidden_hosts: Vec::new(),
        }
    }
}

impl Default for VirtualListConfig {
    fn default() -> Self {
        Self {
            estimated_item_height: 40.0,
            container_height: 400.0,
            overscan: 3,
            scroll_bucket: 10.0,
            range_cache_size: 5,
            max_height_overrides: 1000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_entries: 1000,
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/jumpmark/store.json".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl UsageConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl StorageConfig {
    /// Store path with a leading `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("jumpmark")
            .join("config.toml")
    }

    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from_path(&Self::config_path())
    }

    /// Load config from `path`, falling back to defaults on any failure.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse config");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config");
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> JumpResult<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }

    /// Validate and clamp config values to acceptable ranges
    pub fn validate(&mut self) {
        let ranking = &mut self.ranking;
        if !(ranking.empty_query_score > 0.0 && ranking.empty_query_score <= 1.0) {
            ranking.empty_query_score = RankingConfig::default().empty_query_score;
        }
        ranking.usage_boost_cap = ranking.usage_boost_cap.clamp(0.0, 50.0);
        ranking.usage_boost_scale = ranking.usage_boost_scale.clamp(0.0, 20.0);
        ranking.max_results = ranking.max_results.map(|n| n.max(1));

        let list = &mut self.virtual_list;
        list.estimated_item_height = list.estimated_item_height.max(1.0);
        list.container_height = list.container_height.max(0.0);
        list.overscan = list.overscan.min(50);
        list.scroll_bucket = list.scroll_bucket.max(1.0);
        list.range_cache_size = list.range_cache_size.clamp(1, 64);
        list.max_height_overrides = list.max_height_overrides.max(1);

        self.cache.max_entries = self.cache.max_entries.max(2);

        self.usage.max_retries = self.usage.max_retries.min(10);
        self.usage.base_delay_ms = self.usage.base_delay_ms.min(1000);
    }

    /// Save config to the default location
    pub fn save(&self) -> JumpResult<()> {
        self.save_to_path(&Self::config_path())
    }

    /// Save config to `path`, creating the parent directory if needed
    pub fn save_to_path(&self, path: &Path) -> JumpResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }
}
