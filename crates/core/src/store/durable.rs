// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed facade that picks a backend per call.
//!
//! The facade is the error boundary of the storage layer: it never returns
//! an error. A primary failure is logged and the call is retried on the
//! fallback; a fallback failure is logged and the call yields its neutral
//! value (`None`, an empty list, zero).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{Change, FallbackBackend, KvBackend, SqliteBackend};
use crate::error::{Error, Result};
use crate::schema::{index_value, DatabaseSchema};

/// Durable store with transparent fallback to a degraded backend.
pub struct DurableStore {
    schema: &'static DatabaseSchema,
    primary: Option<SqliteBackend>,
    fallback: FallbackBackend,
    /// Set once the primary could not be opened; later calls skip it.
    degraded: AtomicBool,
}

/// Path of the fallback mirror for a primary database path
/// (`offline.db` → `offline.fallback.json`).
pub fn fallback_path(path: &Path) -> PathBuf {
    path.with_extension("fallback.json")
}

impl DurableStore {
    /// Opens the store for the database file at `path`.
    ///
    /// Never fails: if the primary cannot be opened the store starts out
    /// degraded and serves every call from the fallback file next to it.
    pub fn open(path: &Path, schema: &'static DatabaseSchema) -> Self {
        let primary = SqliteBackend::new(path, schema);
        let store = DurableStore {
            schema,
            fallback: FallbackBackend::open(schema, &fallback_path(path)),
            primary: Some(primary),
            degraded: AtomicBool::new(false),
        };

        if let Some(Err(e)) = store.primary.as_ref().map(SqliteBackend::ping) {
            store.mark_degraded(&e);
        }
        store
    }

    /// Opens an in-memory store (for testing). Falls back to an in-memory
    /// fallback if SQLite itself is unusable.
    pub fn in_memory(schema: &'static DatabaseSchema) -> Self {
        let primary = match SqliteBackend::open_in_memory(schema) {
            Ok(primary) => Some(primary),
            Err(e) => {
                tracing::warn!(db = schema.name, error = %e, "in-memory primary unavailable");
                None
            }
        };
        DurableStore {
            schema,
            degraded: AtomicBool::new(primary.is_none()),
            primary,
            fallback: FallbackBackend::in_memory(schema),
        }
    }

    /// Creates a store that only has the degraded backend.
    pub fn degraded(schema: &'static DatabaseSchema, fallback: FallbackBackend) -> Self {
        DurableStore {
            schema,
            primary: None,
            fallback,
            degraded: AtomicBool::new(true),
        }
    }

    /// Returns the schema this store was opened with.
    pub fn schema(&self) -> &'static DatabaseSchema {
        self.schema
    }

    /// True when calls are being served by the fallback only.
    pub fn is_degraded(&self) -> bool {
        self.primary.is_none() || self.degraded.load(Ordering::Acquire)
    }

    fn mark_degraded(&self, error: &Error) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                db = self.schema.name,
                error = %error,
                "primary store unavailable, continuing on fallback store"
            );
        }
    }

    fn active_primary(&self) -> Option<&SqliteBackend> {
        if self.degraded.load(Ordering::Acquire) {
            return None;
        }
        self.primary.as_ref()
    }

    /// Runs `op` on the primary, then on the fallback if the primary fails.
    fn run<T>(
        &self,
        op: &'static str,
        store: &str,
        mut f: impl FnMut(&dyn KvBackend) -> Result<T>,
    ) -> Option<T> {
        if let Some(primary) = self.active_primary() {
            match f(primary) {
                Ok(value) => return Some(value),
                Err(e @ Error::Unavailable(_)) => self.mark_degraded(&e),
                Err(e) => tracing::warn!(
                    db = self.schema.name,
                    op,
                    store,
                    error = %e,
                    "primary store call failed, retrying on fallback"
                ),
            }
        }

        match f(&self.fallback) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    db = self.schema.name,
                    op,
                    store,
                    error = %e,
                    "fallback store call failed"
                );
                None
            }
        }
    }

    fn decode<T: DeserializeOwned>(store: &str, record: Value) -> Option<T> {
        match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(store, error = %e, "skipping undecodable record");
                None
            }
        }
    }

    /// Insert or replace an item.
    pub fn put<T: Serialize>(&self, store: &str, item: &T) {
        let record = match serde_json::to_value(item) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(store, error = %e, "cannot serialize record");
                return;
            }
        };
        self.run("put", store, |backend| backend.put(store, &record));
    }

    /// Fetch an item by primary key.
    pub fn get<T: DeserializeOwned>(&self, store: &str, id: &str) -> Option<T> {
        self.run("get", store, |backend| backend.get(store, id))
            .flatten()
            .and_then(|record| Self::decode(store, record))
    }

    /// Fetch every item in a store, ordered by primary key.
    pub fn get_all<T: DeserializeOwned>(&self, store: &str) -> Vec<T> {
        self.run("get_all", store, |backend| backend.get_all(store))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|record| Self::decode(store, record))
            .collect()
    }

    /// Fetch every item whose `index` field equals `value`.
    pub fn get_by_index<T: DeserializeOwned>(
        &self,
        store: &str,
        index: &str,
        value: impl Into<Value>,
    ) -> Vec<T> {
        let Some(value) = index_value(&value.into()) else {
            return Vec::new();
        };
        self.run("get_by_index", store, |backend| {
            backend.get_by_index(store, index, &value)
        })
        .unwrap_or_default()
        .into_iter()
        .filter_map(|record| Self::decode(store, record))
        .collect()
    }

    /// Delete an item by primary key.
    pub fn delete(&self, store: &str, id: &str) {
        self.run("delete", store, |backend| backend.delete(store, id));
    }

    /// Delete every item in a store.
    pub fn clear(&self, store: &str) {
        self.run("clear", store, |backend| backend.clear(store));
    }

    /// Count items, optionally restricted to one index value.
    pub fn count(&self, store: &str, index: Option<(&str, Value)>) -> usize {
        let index = match index {
            Some((name, value)) => match index_value(&value) {
                Some(value) => Some((name, value)),
                None => return 0,
            },
            None => None,
        };
        self.run("count", store, |backend| {
            backend.count(store, index.as_ref().map(|(n, v)| (*n, v.as_str())))
        })
        .unwrap_or(0)
    }

    /// Atomic read-modify-write of one item, which may be missing.
    ///
    /// `apply` sees the current item (`None` when absent or undecodable)
    /// and decides what to do with it. Returns true when the store changed.
    pub fn update<T, F>(&self, store: &str, id: &str, mut apply: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(Option<T>) -> Change<T>,
    {
        let mut raw = |record: Option<Value>| -> Change<Value> {
            let current = record.and_then(|record| Self::decode(store, record));
            match apply(current) {
                Change::Keep => Change::Keep,
                Change::Delete => Change::Delete,
                Change::Put(next) => match serde_json::to_value(next) {
                    Ok(next) => Change::Put(next),
                    Err(e) => {
                        tracing::warn!(store, error = %e, "cannot serialize record");
                        Change::Keep
                    }
                },
            }
        };

        self.run("update", store, |backend| backend.update(store, id, &mut raw))
            .unwrap_or(false)
    }

    /// Atomic read-modify-write of an existing item.
    ///
    /// `apply` receives the current item and returns the replacement, or
    /// `None` to leave it untouched. Returns the item as it was before the
    /// write; `None` means nothing was written.
    pub fn modify<T, F>(&self, store: &str, id: &str, mut apply: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(T) -> Option<T>,
    {
        let mut before: Option<Value> = None;
        let mut raw = |record: Option<Value>| -> Change<Value> {
            before = record.clone();
            let next = record
                .and_then(|record| Self::decode::<T>(store, record))
                .and_then(&mut apply)
                .map(serde_json::to_value);
            match next {
                Some(Ok(next)) => Change::Put(next),
                Some(Err(e)) => {
                    tracing::warn!(store, error = %e, "cannot serialize record");
                    Change::Keep
                }
                None => Change::Keep,
            }
        };

        let written = self
            .run("modify", store, |backend| backend.update(store, id, &mut raw))
            .unwrap_or(false);
        if !written {
            return None;
        }
        before.and_then(|before| Self::decode(store, before))
    }
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
