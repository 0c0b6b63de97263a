// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key/value storage with secondary indexes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   DurableStore   │  typed facade, never returns errors
//! └────────┬─────────┘
//!          │ KvBackend (trait)
//!    ┌─────┴──────────────┐
//!    ▼                    ▼
//! ┌──────────────┐  ┌────────────────┐
//! │ SqliteBackend│  │ FallbackBackend│
//! │  (primary)   │  │   (degraded)   │
//! └──────────────┘  └────────────────┘
//! ```
//!
//! Selection happens inside each facade call: the primary is tried first and
//! any failure is logged and retried against the fallback.

mod durable;
mod fallback;
mod sqlite;

pub use durable::{fallback_path, DurableStore};
pub use fallback::FallbackBackend;
pub use sqlite::SqliteBackend;

use serde_json::Value;

use crate::error::Result;

/// Operations shared by both storage backends.
///
/// Records are JSON objects; their key and index values are read from the
/// fields named in the [`crate::schema::StoreSchema`]. Index lookups take
/// the normalized string form produced by [`crate::schema::index_value`].
/// Multi-record results are ordered by primary key.
pub trait KvBackend: Send + Sync {
    /// Insert or replace a record.
    fn put(&self, store: &str, record: &Value) -> Result<()>;

    /// Fetch a record by primary key.
    fn get(&self, store: &str, id: &str) -> Result<Option<Value>>;

    /// Fetch every record in a store.
    fn get_all(&self, store: &str) -> Result<Vec<Value>>;

    /// Fetch every record whose `index` field equals `value`.
    fn get_by_index(&self, store: &str, index: &str, value: &str) -> Result<Vec<Value>>;

    /// Delete a record. Deleting a missing record is not an error.
    fn delete(&self, store: &str, id: &str) -> Result<()>;

    /// Delete every record in a store.
    fn clear(&self, store: &str) -> Result<()>;

    /// Count records, optionally restricted to one index value.
    fn count(&self, store: &str, index: Option<(&str, &str)>) -> Result<usize>;

    /// Atomic single-record read-modify-write.
    ///
    /// Passes the current record (or `None` when it is missing) to `apply`
    /// and carries out the [`Change`] it returns. Returns true when the
    /// store changed. No other writer can interleave between the read and
    /// the write, so an insert-if-missing or delete-if-empty is race free.
    fn update(
        &self,
        store: &str,
        id: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Change<Value>,
    ) -> Result<bool>;
}

/// What an atomic update does with the record it was shown.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    /// Leave the record, or its absence, as it is.
    Keep,
    /// Insert or replace the record. Its key must not change.
    Put(T),
    Delete,
}
