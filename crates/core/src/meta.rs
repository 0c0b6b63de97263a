// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Generic key/value bag in the `syncMeta` store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::stores;
use crate::store::DurableStore;

/// Key prefix of per-session socket event queues.
pub const SOCKET_QUEUE_PREFIX: &str = "socket_queue_";
/// Key prefix of sync bookkeeping entries.
pub const LAST_SYNC_PREFIX: &str = "last_sync_";
/// Key prefix of miscellaneous offline artifacts.
pub const OFFLINE_PREFIX: &str = "offline_";

/// Prefixes whose entries belong to the signed-in user and go on logout.
pub const OFFLINE_ARTIFACT_PREFIXES: &[&str] =
    &[SOCKET_QUEUE_PREFIX, LAST_SYNC_PREFIX, OFFLINE_PREFIX];

/// Timestamp (ms) of the last finished replay pass.
pub const LAST_SYNC_COMPLETED_AT: &str = "last_sync_completed_at";

/// One entry of the meta bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaEntry {
    pub key: String,
    pub value: Value,
    pub updated_at: u64,
}

pub fn get_meta(store: &DurableStore, key: &str) -> Option<MetaEntry> {
    store.get(stores::SYNC_META, key)
}

pub fn set_meta(store: &DurableStore, key: &str, value: Value, now_ms: u64) {
    let entry = MetaEntry {
        key: key.to_string(),
        value,
        updated_at: now_ms,
    };
    store.put(stores::SYNC_META, &entry);
}

pub fn delete_meta(store: &DurableStore, key: &str) {
    store.delete(stores::SYNC_META, key);
}

/// Deletes every entry whose key starts with one of `prefixes`.
///
/// Returns the number of entries deleted.
pub fn delete_meta_with_prefixes(store: &DurableStore, prefixes: &[&str]) -> usize {
    let doomed: Vec<String> = store
        .get_all::<Value>(stores::SYNC_META)
        .into_iter()
        .filter_map(|entry| entry.get("key").and_then(Value::as_str).map(String::from))
        .filter(|key| prefixes.iter().any(|prefix| key.starts_with(prefix)))
        .collect();

    for key in &doomed {
        delete_meta(store, key);
    }
    doomed.len()
}

#[cfg(test)]
#[path = "meta_tests.rs"]
mod tests;
