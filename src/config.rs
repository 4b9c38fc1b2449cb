use crate::cache::{InMemoryLruCache, MatchBlobSet, PersistentCache, SharedQueryCache};
use crate::error::BundleGrepError;
use crate::search::engine::Classifier;
use crate::search::query::Query;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub categories: CategoryConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Which query cache to put in front of the search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: String,
    pub capacity: usize,
    pub directory: PathBuf,
}

pub const BOUNDED_MEMORY_BACKEND: &str = "bounded-memory";
pub const PERSISTENT_BACKEND: &str = "persistent";
pub const NO_CACHE_BACKEND: &str = "none";

fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("bundlegrep")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BOUNDED_MEMORY_BACKEND.to_string(),
            capacity: 64,
            directory: default_cache_directory(),
        }
    }
}

impl CacheConfig {
    /// Build the configured backend.
    ///
    /// An unrecognised backend name disables caching with a warning. A
    /// capacity of zero is an error.
    pub fn build(&self) -> crate::error::Result<Option<SharedQueryCache>> {
        match self.backend.as_str() {
            BOUNDED_MEMORY_BACKEND | "InMemoryLRUCache" => {
                debug!("Using an in-memory query cache of {} entries", self.capacity);
                let cache: InMemoryLruCache<Query, MatchBlobSet> =
                    InMemoryLruCache::new(self.capacity)?;
                Ok(Some(Arc::new(cache)))
            }
            PERSISTENT_BACKEND | "GeneralCache" => {
                debug!("Using a persistent query cache in {}", self.directory.display());
                let cache: PersistentCache<Query, MatchBlobSet> =
                    PersistentCache::new(&self.directory)?;
                Ok(Some(Arc::new(cache)))
            }
            NO_CACHE_BACKEND => Ok(None),
            other => {
                warn!("Unrecognised cache backend '{other}', continuing without a cache");
                Ok(None)
            }
        }
    }
}

/// Where the node logs live inside an extracted bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub log_directory: String,
    pub node_log_subdirectory: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            log_directory: "logs".to_string(),
            node_log_subdirectory: String::new(),
        }
    }
}

impl LayoutConfig {
    pub fn log_dir(&self, bundle_root: &Path) -> PathBuf {
        [&self.log_directory, &self.node_log_subdirectory]
            .into_iter()
            .filter(|component| !component.is_empty())
            .fold(bundle_root.to_path_buf(), |dir, component| dir.join(component))
    }
}

/// Filename patterns that assign log files to categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub primary: String,
    pub secondary: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            primary: "RESOURCEMANAGER".to_string(),
            secondary: "NODEMANAGER".to_string(),
        }
    }
}

impl CategoryConfig {
    pub fn classifier(&self) -> crate::error::Result<Classifier> {
        Classifier::new(&self.primary, &self.secondary)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub parallel_scan: bool,
    pub pattern_cache_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel_scan: true,
            pattern_cache_size: 32,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        match Self::find_config_path()? {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn find_config_path() -> Result<Option<PathBuf>> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("bundlegrep/config.toml");
            if xdg_path.exists() {
                return Ok(Some(xdg_path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".bundlegrep.toml");
            if home_path.exists() {
                return Ok(Some(home_path));
            }
        }

        let current_path = Path::new(".bundlegrep.toml");
        if current_path.exists() {
            return Ok(Some(current_path.to_path_buf()));
        }

        Ok(None)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Reject values no component could work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.search.pattern_cache_size == 0 {
            return Err(BundleGrepError::Config(
                "search.pattern_cache_size must be at least 1".to_string(),
            ));
        }
        self.categories.classifier().map(|_| ())
    }
}
