// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_core::schema::stores;
use tether_core::{ClockSource, DurableStore, FallbackBackend, KvBackend, SystemClock, CACHE_SCHEMA};

use super::evict::{fit_to_budget, EvictionPolicy};
use super::{CacheSnapshot, NormalizedCache};
use crate::config::Paths;

/// Key of the single snapshot record.
pub const SNAPSHOT_KEY: &str = "graphql-cache";

/// Stored form: the snapshot travels as one serialized string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    key: String,
    data: String,
    saved_at: u64,
}

impl SnapshotRecord {
    fn decode(&self) -> Option<CacheSnapshot> {
        match serde_json::from_str(&self.data) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cache snapshot");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { bytes: usize, evicted: usize },
    /// Still over budget after eviction; the previous snapshot stays.
    SkippedOversized,
    /// The backup file could not be written.
    Failed,
}

/// Where [`CachePersister::restore_cache`] found a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Durable,
    Backup,
    Nothing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// The snapshot database is served by its fallback.
    pub degraded: bool,
    pub saved_at: Option<u64>,
    pub bytes: Option<usize>,
    pub entries: Option<usize>,
    pub backup_saved_at: Option<u64>,
}

pub struct CachePersister {
    store: DurableStore,
    backup: FallbackBackend,
    policy: EvictionPolicy,
    clock: Arc<dyn ClockSource>,
}

impl CachePersister {
    pub fn new(store: DurableStore, backup: FallbackBackend, policy: EvictionPolicy) -> Self {
        CachePersister {
            store,
            backup,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Opens the snapshot database and backup file under the data directory.
    pub fn open(paths: &Paths, policy: EvictionPolicy) -> Self {
        CachePersister::new(
            DurableStore::open(&paths.cache_db(), &CACHE_SCHEMA),
            FallbackBackend::open(&CACHE_SCHEMA, &paths.cache_backup()),
            policy,
        )
    }

    /// Creates a persister that keeps everything in memory (for testing).
    pub fn in_memory(policy: EvictionPolicy) -> Self {
        CachePersister::new(
            DurableStore::in_memory(&CACHE_SCHEMA),
            FallbackBackend::in_memory(&CACHE_SCHEMA),
            policy,
        )
    }

    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    fn prepare(&self, cache: &dyn NormalizedCache) -> Result<(SnapshotRecord, usize, usize), PersistOutcome> {
        let fitted = fit_to_budget(cache.extract(), &self.policy)
            .ok_or(PersistOutcome::SkippedOversized)?;
        let data = serde_json::to_string(&fitted.snapshot).map_err(|e| {
            tracing::warn!(error = %e, "cannot serialize cache snapshot");
            PersistOutcome::Failed
        })?;
        let record = SnapshotRecord {
            key: SNAPSHOT_KEY.to_string(),
            data,
            saved_at: self.clock.now_ms(),
        };
        Ok((record, fitted.bytes, fitted.evicted.len()))
    }

    /// Writes the cache to the snapshot database, evicting to fit the budget.
    pub fn persist_cache(&self, cache: &dyn NormalizedCache) -> PersistOutcome {
        let (record, bytes, evicted) = match self.prepare(cache) {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };
        self.store.put(stores::SNAPSHOTS, &record);
        tracing::debug!(bytes, evicted, "cache snapshot persisted");
        PersistOutcome::Written { bytes, evicted }
    }

    /// Writes the cache synchronously to the backup file (exit path).
    pub fn persist_backup(&self, cache: &dyn NormalizedCache) -> PersistOutcome {
        let (record, bytes, evicted) = match self.prepare(cache) {
            Ok(prepared) => prepared,
            Err(outcome) => return outcome,
        };
        let written = serde_json::to_value(&record)
            .map_err(tether_core::Error::from)
            .and_then(|value| self.backup.put(stores::SNAPSHOTS, &value));
        match written {
            Ok(()) => PersistOutcome::Written { bytes, evicted },
            Err(e) => {
                tracing::warn!(error = %e, "cache backup write failed");
                PersistOutcome::Failed
            }
        }
    }

    fn read_backup(&self) -> Option<SnapshotRecord> {
        let value = match self.backup.get(stores::SNAPSHOTS, SNAPSHOT_KEY) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(error = %e, "cache backup unreadable");
                return None;
            }
        };
        serde_json::from_value(value).ok()
    }

    fn clear_backup(&self) {
        if let Err(e) = self.backup.clear(stores::SNAPSHOTS) {
            tracing::warn!(error = %e, "cache backup could not be cleared");
        }
    }

    /// Pre-warms `cache` from the snapshot database, else from the backup.
    ///
    /// A successful restore from either source clears the backup.
    pub fn restore_cache(&self, cache: &dyn NormalizedCache) -> RestoreSource {
        let durable = self
            .store
            .get::<SnapshotRecord>(stores::SNAPSHOTS, SNAPSHOT_KEY)
            .and_then(|record| record.decode());
        if let Some(snapshot) = durable {
            tracing::info!(entries = snapshot.len(), "cache restored from snapshot");
            cache.restore(snapshot);
            self.clear_backup();
            return RestoreSource::Durable;
        }

        if let Some(snapshot) = self.read_backup().and_then(|record| record.decode()) {
            tracing::info!(entries = snapshot.len(), "cache restored from backup");
            cache.restore(snapshot);
            self.clear_backup();
            return RestoreSource::Backup;
        }

        RestoreSource::Nothing
    }

    /// Removes the snapshot and the backup.
    pub fn clear_persisted_cache(&self) {
        self.store.clear(stores::SNAPSHOTS);
        self.clear_backup();
    }

    pub fn stats(&self) -> CacheStats {
        let durable = self
            .store
            .get::<SnapshotRecord>(stores::SNAPSHOTS, SNAPSHOT_KEY);
        CacheStats {
            degraded: self.store.is_degraded(),
            saved_at: durable.as_ref().map(|record| record.saved_at),
            bytes: durable.as_ref().map(|record| record.data.len()),
            entries: durable
                .as_ref()
                .and_then(|record| serde_json::from_str::<Value>(&record.data).ok())
                .and_then(|value| value.as_object().map(|object| object.len())),
            backup_saved_at: self.read_backup().map(|record| record.saved_at),
        }
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
