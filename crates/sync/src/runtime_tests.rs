// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::cache::EvictionPolicy;
use crate::test_helpers::{MemoryCache, MockExecutor};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tether_core::{ManualClock, MutationStatus, NewMutation};

fn detector() -> Arc<ConnectivityDetector> {
    Arc::new(ConnectivityDetector::new(Arc::new(ManualClock::new(1_000))))
}

fn draft() -> NewMutation {
    NewMutation::new("Register", "mutation Register { ok }", json!({}))
}

#[test]
fn manager_uses_configured_retry_budget() {
    let config = SyncConfig {
        max_retries: 7,
        ..SyncConfig::default()
    };
    let manager = build_sync_manager(
        Arc::new(DurableStore::in_memory(&OFFLINE_SCHEMA)),
        &config,
        detector(),
        Arc::new(MockExecutor::new()),
    );

    assert_eq!(manager.queue_mutation(draft()).max_retries, 7);
    assert_eq!(manager.queue().enqueue(draft()).max_retries, 7);
}

#[tokio::test]
async fn disabled_sweep_leaves_claims_alone() {
    let config = SyncConfig {
        stale_claim_after_secs: 0,
        ..SyncConfig::default()
    };
    let executor = Arc::new(MockExecutor::new());
    let manager = build_sync_manager(
        Arc::new(DurableStore::in_memory(&OFFLINE_SCHEMA)),
        &config,
        detector(),
        executor.clone(),
    );
    let stuck = manager.queue().enqueue(draft());
    manager.queue().claim(&stuck.id).unwrap();

    let report = manager.sync_pending().await.unwrap();
    assert_eq!(report.reclaimed, 0);
    assert!(executor.calls().is_empty());
    assert_eq!(
        manager.queue().get(&stuck.id).unwrap().status,
        MutationStatus::InFlight
    );
}

#[tokio::test]
async fn start_restores_cache_and_replays_queue() {
    let dir = TempDir::new().unwrap();
    let paths = Paths::new(dir.path());
    let config = Config::default();

    let previous = MemoryCache::new();
    previous.write("ROOT_QUERY", json!({ "me": "u1" }));
    CachePersister::open(&paths, EvictionPolicy::default()).persist_cache(&previous);
    MutationQueue::new(
        Arc::new(DurableStore::open(&paths.offline_db(), &OFFLINE_SCHEMA)),
        Arc::new(SystemClock),
    )
    .enqueue(draft());

    let executor = Arc::new(MockExecutor::new());
    let cache = Arc::new(MemoryCache::new());
    let runtime = OfflineRuntime::start(
        &paths,
        &config,
        detector(),
        executor.clone(),
        cache.clone(),
    );
    assert_eq!(runtime.restored(), RestoreSource::Durable);
    assert_eq!(cache.snapshot().get("ROOT_QUERY"), Some(&json!({ "me": "u1" })));

    tokio::time::timeout(Duration::from_secs(5), async {
        while runtime.manager().queue().stats().total() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(executor.calls().len(), 1);

    runtime.shutdown().await;
}
