// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Size-budget enforcement for snapshots.

use super::{CacheSnapshot, ROOT_QUERY};

/// Entity prefixes evicted first by default, least essential first.
pub const DEFAULT_EVICTABLE_PREFIXES: &[&str] = &[
    "Reaction:",
    "ChatMessage:",
    "Question:",
    "Notification:",
    "Attendee:",
    "Session:",
    "Speaker:",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Largest serialized snapshot that may be written.
    pub max_bytes: usize,
    /// Evictable key prefixes in priority order (least essential first).
    pub prefixes: Vec<String>,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy {
            max_bytes: 5 * 1024 * 1024,
            prefixes: DEFAULT_EVICTABLE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// A snapshot that fits the budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Fitted {
    pub snapshot: CacheSnapshot,
    /// Serialized size after eviction.
    pub bytes: usize,
    /// Keys removed to get under budget, in removal order.
    pub evicted: Vec<String>,
}

/// Serialized JSON size of a snapshot in bytes.
pub fn snapshot_size(snapshot: &CacheSnapshot) -> usize {
    serde_json::to_vec(snapshot).map(|bytes| bytes.len()).unwrap_or(usize::MAX)
}

/// Trims `snapshot` until it fits `policy.max_bytes`.
///
/// Walks the prefixes in order; while still over budget, each prefix loses
/// the first half (rounded up) of its keys in key order. The root query
/// entry is never removed. Returns `None` when the snapshot is still over
/// budget after every prefix was visited, in which case nothing should be
/// written.
pub fn fit_to_budget(mut snapshot: CacheSnapshot, policy: &EvictionPolicy) -> Option<Fitted> {
    let mut bytes = snapshot_size(&snapshot);
    let mut evicted = Vec::new();

    for prefix in &policy.prefixes {
        if bytes <= policy.max_bytes {
            break;
        }

        let keys: Vec<String> = snapshot
            .keys()
            .filter(|key| key.starts_with(prefix.as_str()) && key.as_str() != ROOT_QUERY)
            .cloned()
            .collect();
        let doomed = keys.len().div_ceil(2);
        for key in keys.into_iter().take(doomed) {
            snapshot.remove(&key);
            evicted.push(key);
        }
        bytes = snapshot_size(&snapshot);
    }

    if bytes > policy.max_bytes {
        tracing::warn!(
            bytes,
            max_bytes = policy.max_bytes,
            "snapshot over budget after eviction, skipping write"
        );
        return None;
    }
    if !evicted.is_empty() {
        tracing::info!(evicted = evicted.len(), bytes, "evicted cache entries to fit budget");
    }
    Some(Fitted {
        snapshot,
        bytes,
        evicted,
    })
}

#[cfg(test)]
#[path = "evict_tests.rs"]
mod tests;
