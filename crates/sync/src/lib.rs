// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-sync: replay, realtime catch-up and cache persistence
//!
//! Builds on the queues in `tether-core`:
//! - [`manager`] replays queued mutations when the network is usable
//! - [`socket`] replays queued realtime sends after a room rejoin
//! - [`cache`] keeps the client cache warm across restarts
//! - [`cleanup`] wipes per-user state on logout
//! - [`runtime`] starts all of the above from a loaded [`Config`]
//!
//! Progress is published on an [`EventBus`] so UI code never polls.

pub mod bus;
pub mod cache;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod runtime;
pub mod socket;

#[cfg(test)]
mod test_helpers;

pub use bus::{EventBus, Subscription, SyncEvent};
pub use cache::{
    setup_cache_persistence, CachePersistenceHandle, CachePersister, CacheSnapshot,
    EvictionPolicy, NormalizedCache, PersistenceTiming,
};
pub use cleanup::{perform_logout_cleanup, spawn_logout_cleanup, CleanupReport};
pub use config::{resolve_data_dir, Config, Paths};
pub use error::{Error, Result};
pub use executor::{ExecuteError, ExecuteRequest, MutationExecutor};
pub use manager::{init_sync_manager, SyncHandle, SyncManager, SyncReport};
pub use runtime::{build_sync_manager, OfflineRuntime};
pub use socket::{EmitError, SocketEmitter, SocketReplayer, SocketSend};
