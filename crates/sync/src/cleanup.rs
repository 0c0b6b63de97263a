// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Purges per-user offline state on logout.

use std::sync::Arc;

use serde::Serialize;
use tether_core::meta::{self, OFFLINE_ARTIFACT_PREFIXES};
use tether_core::schema::stores;
use tether_core::DurableStore;
use tokio::task::JoinHandle;

use crate::cache::CachePersister;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub mutations_cleared: usize,
    pub registrations_cleared: usize,
    pub meta_entries_cleared: usize,
    pub cache_cleared: bool,
}

/// Clears the mutation queue (whatever the record states), cached
/// registrations, the cache snapshot and its backup, and every offline
/// artifact in the meta bag.
///
/// Never fails; storage problems are logged by the store and the rest of
/// the cleanup still runs.
pub fn perform_logout_cleanup(
    offline: &DurableStore,
    persister: Option<&CachePersister>,
) -> CleanupReport {
    let mut report = CleanupReport {
        mutations_cleared: offline.count(stores::MUTATION_QUEUE, None),
        registrations_cleared: offline.count(stores::REGISTRATIONS, None),
        ..CleanupReport::default()
    };
    offline.clear(stores::MUTATION_QUEUE);
    offline.clear(stores::REGISTRATIONS);
    report.meta_entries_cleared = meta::delete_meta_with_prefixes(offline, OFFLINE_ARTIFACT_PREFIXES);

    if let Some(persister) = persister {
        persister.clear_persisted_cache();
        report.cache_cleared = true;
    }

    tracing::info!(
        mutations = report.mutations_cleared,
        registrations = report.registrations_cleared,
        meta = report.meta_entries_cleared,
        "offline state cleared"
    );
    report
}

/// Runs [`perform_logout_cleanup`] on the blocking pool without waiting.
///
/// The handle may be dropped; logout does not need to wait for it.
pub fn spawn_logout_cleanup(
    offline: Arc<DurableStore>,
    persister: Option<Arc<CachePersister>>,
) -> JoinHandle<CleanupReport> {
    tokio::task::spawn_blocking(move || perform_logout_cleanup(&offline, persister.as_deref()))
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
