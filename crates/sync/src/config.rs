// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration.
//!
//! Configuration is read from `<data_dir>/config.toml`. Every field has a
//! default, so a missing file or a partial file is fine:
//!
//! ```toml
//! [sync]
//! interval_secs = 30
//! max_retries = 3
//! stale_claim_after_secs = 600
//!
//! [cache]
//! debounce_ms = 2000
//! periodic_secs = 30
//! max_bytes = 5242880
//! evictable_prefixes = ["Message:", "Reaction:"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{EvictionPolicy, PersistenceTiming, DEFAULT_EVICTABLE_PREFIXES};
use crate::error::{Error, Result};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TETHER_DATA_DIR";

const APP_DIR_NAME: &str = "tether";
const FALLBACK_DIR_NAME: &str = ".tether";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between periodic replay passes.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Retry budget for newly queued mutations.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Age after which an `in_flight` claim is considered abandoned.
    /// 0 disables the sweep.
    #[serde(default = "default_stale_claim_after_secs")]
    pub stale_claim_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_periodic_secs")]
    pub periodic_secs: u64,
    /// Size budget of a persisted snapshot in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Entity-key prefixes that may be evicted, least essential first.
    #[serde(default = "default_evictable_prefixes")]
    pub evictable_prefixes: Vec<String>,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    tether_core::mutation::DEFAULT_MAX_RETRIES
}

fn default_stale_claim_after_secs() -> u64 {
    600
}

fn default_debounce_ms() -> u64 {
    2_000
}

fn default_periodic_secs() -> u64 {
    30
}

fn default_max_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_evictable_prefixes() -> Vec<String> {
    DEFAULT_EVICTABLE_PREFIXES
        .iter()
        .map(|prefix| prefix.to_string())
        .collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_secs: default_interval_secs(),
            max_retries: default_max_retries(),
            stale_claim_after_secs: default_stale_claim_after_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            debounce_ms: default_debounce_ms(),
            periodic_secs: default_periodic_secs(),
            max_bytes: default_max_bytes(),
            evictable_prefixes: default_evictable_prefixes(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// `None` when the stale-claim sweep is disabled.
    pub fn stale_claim_after(&self) -> Option<Duration> {
        (self.stale_claim_after_secs > 0).then(|| Duration::from_secs(self.stale_claim_after_secs))
    }
}

impl CacheConfig {
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            max_bytes: self.max_bytes,
            prefixes: self.evictable_prefixes.clone(),
        }
    }

    pub fn timing(&self) -> PersistenceTiming {
        PersistenceTiming {
            debounce: Duration::from_millis(self.debounce_ms),
            periodic: Duration::from_secs(self.periodic_secs),
        }
    }
}

impl Config {
    /// Loads `config.toml` from `data_dir`; a missing file yields defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_secs == 0 {
            return Err(Error::Config("sync.interval_secs must be at least 1".into()));
        }
        if self.sync.max_retries == 0 {
            return Err(Error::Config("sync.max_retries must be at least 1".into()));
        }
        if self.cache.periodic_secs == 0 {
            return Err(Error::Config("cache.periodic_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Resolves the data directory: explicit flag, then `TETHER_DATA_DIR`, then
/// the platform data dir, then `./.tether`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR_NAME))
}

/// Locations of every file under the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Paths {
            data_dir: data_dir.into(),
        }
    }

    pub fn config(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    /// Primary offline database.
    pub fn offline_db(&self) -> PathBuf {
        self.data_dir.join("offline.db")
    }

    /// Degraded mirror of the offline database.
    pub fn offline_fallback(&self) -> PathBuf {
        tether_core::store::fallback_path(&self.offline_db())
    }

    /// Primary cache snapshot database.
    pub fn cache_db(&self) -> PathBuf {
        self.data_dir.join("cache.db")
    }

    /// Backup written synchronously on unload.
    pub fn cache_backup(&self) -> PathBuf {
        self.data_dir.join("cache.backup.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("tether.log")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
