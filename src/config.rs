//! Repository configuration.
//!
//! Precedence: env > first config file found > defaults. Files are searched in order:
//! explicit path, `$NEXUS_REPO_CONFIG`, `<config dir>/nexus-repo.toml`, `./nexus-repo.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const CONFIG_FILE_NAME: &str = "nexus-repo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Resolve unknown collection names by creating them on first write.
    pub auto_create_collections: bool,
    /// Bulk requests buffered before the writer flushes on its own.
    pub bulk_max_pending: usize,
    /// Worker threads a bulk flush is spread across.
    pub bulk_workers: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { auto_create_collections: true, bulk_max_pending: 500, bulk_workers: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
    pub retention: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: None, level: "info".to_string(), retention: 7 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Page size used when a request asks for limit 0.
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub store: StoreOptions,
    pub log: LogConfig,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: crate::store::MAX_LIMIT,
            store: StoreOptions::default(),
            log: LogConfig::default(),
        }
    }
}

impl RepoConfig {
    /// Loads defaults, the first config file found, then env overrides.
    ///
    /// # Errors
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut cfg = Self::default();
        if let Some(path) = find_config_paths(explicit).into_iter().find(|p| p.exists()) {
            let s = std::fs::read_to_string(&path)?;
            cfg = Self::from_toml_str(&s)?;
            log::debug!("loaded config from {}", path.display());
        }
        cfg.apply_env();
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if `s` is not a valid config document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let mut cfg: Self = toml::from_str(s)?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Overrides from `NEXUS_REPO_*` environment variables; unparsable values are ignored.
    pub fn apply_env(&mut self) {
        fn env_usize(key: &str) -> Option<usize> {
            std::env::var(key).ok().and_then(|s| s.trim().parse::<usize>().ok())
        }
        if let Some(n) = env_usize("NEXUS_REPO_DEFAULT_PAGE_LIMIT") {
            self.default_page_limit = n;
        }
        if let Some(n) = env_usize("NEXUS_REPO_MAX_PAGE_LIMIT") {
            self.max_page_limit = n;
        }
        if let Some(n) = env_usize("NEXUS_REPO_BULK_WORKERS") {
            self.store.bulk_workers = n;
        }
        if let Some(n) = env_usize("NEXUS_REPO_BULK_MAX_PENDING") {
            self.store.bulk_max_pending = n;
        }
        self.normalize();
    }

    /// Resolves a requested page size: 0 means the default, and no request exceeds the maximum.
    #[must_use]
    pub fn page_limit(&self, requested: usize) -> usize {
        let n = if requested == 0 { self.default_page_limit } else { requested };
        n.min(self.max_page_limit)
    }

    fn normalize(&mut self) {
        self.max_page_limit = self.max_page_limit.clamp(1, crate::store::MAX_LIMIT);
        self.default_page_limit = self.default_page_limit.clamp(1, self.max_page_limit);
        self.store.bulk_workers = self.store.bulk_workers.max(1);
        self.store.bulk_max_pending = self.store.bulk_max_pending.max(1);
    }
}

fn find_config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = vec![];
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("NEXUS_REPO_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}
