// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::sync::Arc;

use tether_core::{DurableStore, MutationQueue, SocketQueue, SystemClock, OFFLINE_SCHEMA};
use tether_sync::{CachePersister, Config, Paths};

use crate::error::Result;

/// Stores opened for one command invocation.
pub struct Context {
    pub config: Config,
    pub offline: Arc<DurableStore>,
}

impl Context {
    /// Loads the config and opens the offline database under `paths`.
    pub fn open(paths: &Paths) -> Result<Self> {
        fs::create_dir_all(&paths.data_dir)?;
        let config = Config::load(&paths.data_dir)?;
        let offline = Arc::new(DurableStore::open(&paths.offline_db(), &OFFLINE_SCHEMA));
        tracing::debug!(
            data_dir = %paths.data_dir.display(),
            degraded = offline.is_degraded(),
            "stores opened"
        );
        Ok(Context { config, offline })
    }

    pub fn mutations(&self) -> MutationQueue {
        MutationQueue::new(Arc::clone(&self.offline), Arc::new(SystemClock))
            .with_default_max_retries(self.config.sync.max_retries)
    }

    pub fn sockets(&self) -> SocketQueue {
        SocketQueue::new(Arc::clone(&self.offline), Arc::new(SystemClock))
    }

    pub fn cache(&self, paths: &Paths) -> CachePersister {
        CachePersister::open(paths, self.config.cache.eviction_policy())
    }
}
