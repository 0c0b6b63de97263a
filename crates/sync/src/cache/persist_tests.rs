// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::cache::ROOT_QUERY;
use crate::test_helpers::MemoryCache;
use serde_json::json;
use tempfile::TempDir;
use tether_core::ManualClock;

fn populated() -> MemoryCache {
    let cache = MemoryCache::new();
    cache.write(ROOT_QUERY, json!({"event({\"id\":\"e1\"})": {"__ref": "Event:e1"}}));
    cache.write("Event:e1", json!({"id": "e1", "name": "RustConf"}));
    cache.write("Session:s1", json!({"id": "s1", "title": "Ownership"}));
    cache
}

#[test]
fn persist_then_restore_reproduces_entities() {
    let persister = CachePersister::in_memory(EvictionPolicy::default());
    let cache = populated();
    assert!(matches!(
        persister.persist_cache(&cache),
        PersistOutcome::Written { evicted: 0, .. }
    ));

    let fresh = MemoryCache::new();
    assert_eq!(persister.restore_cache(&fresh), RestoreSource::Durable);
    assert_eq!(fresh.snapshot(), cache.snapshot());
}

#[test]
fn restore_without_snapshot_leaves_cache_alone() {
    let persister = CachePersister::in_memory(EvictionPolicy::default());
    let cache = populated();
    assert_eq!(persister.restore_cache(&cache), RestoreSource::Nothing);
    assert_eq!(cache.snapshot().len(), 3);
}

#[test]
fn restore_falls_back_to_backup_and_clears_it() {
    let persister = CachePersister::in_memory(EvictionPolicy::default());
    let cache = populated();
    assert!(matches!(
        persister.persist_backup(&cache),
        PersistOutcome::Written { .. }
    ));
    assert!(persister.stats().backup_saved_at.is_some());

    let fresh = MemoryCache::new();
    assert_eq!(persister.restore_cache(&fresh), RestoreSource::Backup);
    assert_eq!(fresh.snapshot(), cache.snapshot());
    assert!(persister.stats().backup_saved_at.is_none());
}

#[test]
fn durable_snapshot_wins_over_backup() {
    let persister = CachePersister::in_memory(EvictionPolicy::default());
    let cache = populated();
    persister.persist_cache(&cache);
    cache.write("Event:e2", json!({"id": "e2"}));
    persister.persist_backup(&cache);

    let fresh = MemoryCache::new();
    assert_eq!(persister.restore_cache(&fresh), RestoreSource::Durable);
    assert!(!fresh.snapshot().contains_key("Event:e2"));
    assert!(persister.stats().backup_saved_at.is_none());
}

#[test]
fn eviction_applies_before_write() {
    let cache = populated();
    for i in 0..10 {
        cache.write(&format!("ChatMessage:{i:02}"), json!({"body": "x".repeat(200)}));
    }
    let full = crate::cache::snapshot_size(&cache.snapshot());
    let policy = EvictionPolicy {
        max_bytes: full - 500,
        prefixes: vec!["ChatMessage:".into()],
    };
    let persister = CachePersister::in_memory(policy);

    assert!(matches!(
        persister.persist_cache(&cache),
        PersistOutcome::Written { evicted: 5, .. }
    ));
    let fresh = MemoryCache::new();
    persister.restore_cache(&fresh);
    let restored = fresh.snapshot();
    assert!(restored.contains_key(ROOT_QUERY));
    assert!(!restored.contains_key("ChatMessage:00"));
    assert!(restored.contains_key("ChatMessage:09"));
}

#[test]
fn oversized_snapshot_keeps_previous_write() {
    let clock = Arc::new(ManualClock::new(100));
    let persister = CachePersister::in_memory(EvictionPolicy {
        max_bytes: 400,
        prefixes: vec![],
    })
    .with_clock(clock.clone());
    let cache = populated();
    persister.persist_cache(&cache);

    clock.set(200);
    cache.write("Event:e9", json!({"blob": "z".repeat(1_000)}));
    assert_eq!(
        persister.persist_cache(&cache),
        PersistOutcome::SkippedOversized
    );
    assert_eq!(persister.stats().saved_at, Some(100));
}

#[test]
fn clear_removes_snapshot_and_backup() {
    let persister = CachePersister::in_memory(EvictionPolicy::default());
    let cache = populated();
    persister.persist_cache(&cache);
    persister.persist_backup(&cache);

    persister.clear_persisted_cache();
    assert_eq!(persister.stats(), CacheStats::default());
    assert_eq!(persister.restore_cache(&MemoryCache::new()), RestoreSource::Nothing);
}

#[test]
fn snapshot_survives_process_restart() {
    let dir = TempDir::new().unwrap();
    let paths = Paths::new(dir.path());
    let cache = populated();

    CachePersister::open(&paths, EvictionPolicy::default()).persist_cache(&cache);
    CachePersister::open(&paths, EvictionPolicy::default()).persist_backup(&cache);
    assert!(paths.cache_db().exists());
    assert!(paths.cache_backup().exists());

    let reopened = CachePersister::open(&paths, EvictionPolicy::default());
    let stats = reopened.stats();
    assert_eq!(stats.entries, Some(3));
    assert!(!stats.degraded);

    let fresh = MemoryCache::new();
    assert_eq!(reopened.restore_cache(&fresh), RestoreSource::Durable);
    assert_eq!(fresh.snapshot(), cache.snapshot());
}
