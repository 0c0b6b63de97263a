// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles the replay and cache-persistence loops from a loaded [`Config`].

use std::sync::Arc;

use tether_core::{
    ConnectivityDetector, DurableStore, MutationQueue, SystemClock, OFFLINE_SCHEMA,
};

use crate::cache::{
    setup_cache_persistence, CachePersistenceHandle, CachePersister, NormalizedCache,
    RestoreSource,
};
use crate::config::{Config, Paths, SyncConfig};
use crate::executor::MutationExecutor;
use crate::manager::{init_sync_manager, SyncHandle, SyncManager};

/// Builds a replay manager over `offline` with the configured retry budget
/// and stale-claim sweep.
pub fn build_sync_manager(
    offline: Arc<DurableStore>,
    config: &SyncConfig,
    detector: Arc<ConnectivityDetector>,
    executor: Arc<dyn MutationExecutor>,
) -> SyncManager {
    let queue = MutationQueue::new(offline, Arc::new(SystemClock))
        .with_default_max_retries(config.max_retries);
    SyncManager::new(queue, detector, executor).with_stale_claim_after(config.stale_claim_after())
}

/// Everything started by [`OfflineRuntime::start`].
pub struct OfflineRuntime {
    offline: Arc<DurableStore>,
    manager: Arc<SyncManager>,
    persister: Arc<CachePersister>,
    restored: RestoreSource,
    sync: SyncHandle,
    persistence: CachePersistenceHandle,
}

impl OfflineRuntime {
    /// Opens the stores under `paths`, pre-warms `cache`, then starts the
    /// replay loop and cache persistence on the current tokio runtime.
    pub fn start(
        paths: &Paths,
        config: &Config,
        detector: Arc<ConnectivityDetector>,
        executor: Arc<dyn MutationExecutor>,
        cache: Arc<dyn NormalizedCache>,
    ) -> Self {
        let offline = Arc::new(DurableStore::open(&paths.offline_db(), &OFFLINE_SCHEMA));
        let manager = Arc::new(build_sync_manager(
            Arc::clone(&offline),
            &config.sync,
            detector,
            executor,
        ));

        let persister = Arc::new(CachePersister::open(paths, config.cache.eviction_policy()));
        let restored = persister.restore_cache(cache.as_ref());
        let persistence =
            setup_cache_persistence(Arc::clone(&persister), cache, config.cache.timing());
        let sync = init_sync_manager(Arc::clone(&manager), config.sync.interval());

        tracing::info!(
            data_dir = %paths.data_dir.display(),
            restored = ?restored,
            "offline runtime started"
        );
        OfflineRuntime {
            offline,
            manager,
            persister,
            restored,
            sync,
            persistence,
        }
    }

    pub fn offline(&self) -> &Arc<DurableStore> {
        &self.offline
    }

    pub fn manager(&self) -> &Arc<SyncManager> {
        &self.manager
    }

    pub fn persister(&self) -> &Arc<CachePersister> {
        &self.persister
    }

    /// Where the cache was pre-warmed from at startup.
    pub fn restored(&self) -> RestoreSource {
        self.restored
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    pub fn persistence(&self) -> &CachePersistenceHandle {
        &self.persistence
    }

    /// Stops both loops and waits for them to exit.
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
        self.persistence.shutdown().await;
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
