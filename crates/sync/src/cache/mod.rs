// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cache snapshot persistence.
//!
//! The client's normalized cache is flattened into a [`CacheSnapshot`],
//! trimmed to a size budget by [`fit_to_budget`], and written to a dedicated
//! database. A second copy can be written synchronously to a file backup
//! when the process is about to exit. At boot [`CachePersister::restore_cache`]
//! reads whichever copy is available and pre-warms the cache.

mod evict;
mod persist;
mod timers;

pub use evict::{fit_to_budget, snapshot_size, EvictionPolicy, Fitted, DEFAULT_EVICTABLE_PREFIXES};
pub use persist::{CachePersister, CacheStats, PersistOutcome, RestoreSource, SNAPSHOT_KEY};
pub use timers::{setup_cache_persistence, CachePersistenceHandle, PersistenceTiming};

use std::collections::BTreeMap;

use serde_json::Value;

/// Key of the root query entry, which is never evicted.
pub const ROOT_QUERY: &str = "ROOT_QUERY";

/// Normalized object graph: entity key to entity fields.
pub type CacheSnapshot = BTreeMap<String, Value>;

/// The in-memory client cache being persisted.
pub trait NormalizedCache: Send + Sync {
    /// Copies the current contents out.
    fn extract(&self) -> CacheSnapshot;

    /// Replaces the contents with `snapshot`.
    fn restore(&self, snapshot: CacheSnapshot);
}
