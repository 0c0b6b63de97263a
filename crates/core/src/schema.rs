// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Declared store layout for the durable databases.
//!
//! Every logical store names its key path and its secondary indexes up
//! front. Both backends read the same [`DatabaseSchema`], which is what lets
//! index queries return identical results whichever backend serves them.
//! Adding an index means bumping [`DatabaseSchema::version`]; the primary
//! backend rebuilds index entries for existing records on the next open.

use serde_json::Value;

use crate::error::{Error, Result};

/// Store names used by the offline database.
pub mod stores {
    pub const EVENTS: &str = "events";
    pub const SESSIONS: &str = "sessions";
    pub const SPEAKERS: &str = "speakers";
    pub const VENUES: &str = "venues";
    pub const REGISTRATIONS: &str = "registrations";
    pub const SYNC_META: &str = "syncMeta";
    pub const MUTATION_QUEUE: &str = "mutationQueue";
    pub const SNAPSHOTS: &str = "snapshots";
}

/// A secondary index over one field of a store's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub key_path: &'static str,
}

/// One logical store: its key path and its secondary indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSchema {
    pub name: &'static str,
    pub key_path: &'static str,
    pub indexes: &'static [IndexSpec],
}

impl StoreSchema {
    /// Extracts the primary key of a record.
    pub fn key_of(&self, record: &Value) -> Result<String> {
        record
            .get(self.key_path)
            .and_then(index_value)
            .ok_or_else(|| Error::MissingKey {
                store: self.name.to_string(),
                key_path: self.key_path.to_string(),
            })
    }

    /// Looks up an index by name.
    pub fn index(&self, name: &str) -> Result<&IndexSpec> {
        self.indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| Error::UnknownIndex {
                store: self.name.to_string(),
                index: name.to_string(),
            })
    }

    /// Returns `(index name, normalized value)` for every index the record
    /// participates in. Records missing an indexed field are simply not
    /// present in that index.
    pub fn index_entries(&self, record: &Value) -> Vec<(&'static str, String)> {
        self.indexes
            .iter()
            .filter_map(|index| {
                record
                    .get(index.key_path)
                    .and_then(index_value)
                    .map(|value| (index.name, value))
            })
            .collect()
    }
}

/// A versioned database holding a fixed set of stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub name: &'static str,
    pub version: u32,
    pub stores: &'static [StoreSchema],
}

impl DatabaseSchema {
    /// Looks up a store by name.
    pub fn store(&self, name: &str) -> Result<&StoreSchema> {
        self.stores
            .iter()
            .find(|store| store.name == name)
            .ok_or_else(|| Error::UnknownStore(name.to_string()))
    }
}

/// Normalizes a field value into the string form used by indexes.
///
/// Strings are used as-is, numbers and booleans by their JSON spelling.
/// Null, arrays and objects are not indexable.
pub fn index_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

const BY_EVENT: IndexSpec = IndexSpec {
    name: "eventId",
    key_path: "eventId",
};

/// Schema of the offline database (entity caches, sync meta, mutation queue).
pub const OFFLINE_SCHEMA: DatabaseSchema = DatabaseSchema {
    name: "tether-offline",
    version: 2,
    stores: &[
        StoreSchema {
            name: stores::EVENTS,
            key_path: "id",
            indexes: &[IndexSpec {
                name: "status",
                key_path: "status",
            }],
        },
        StoreSchema {
            name: stores::SESSIONS,
            key_path: "id",
            indexes: &[BY_EVENT],
        },
        StoreSchema {
            name: stores::SPEAKERS,
            key_path: "id",
            indexes: &[BY_EVENT],
        },
        StoreSchema {
            name: stores::VENUES,
            key_path: "id",
            indexes: &[],
        },
        StoreSchema {
            name: stores::REGISTRATIONS,
            key_path: "id",
            indexes: &[
                BY_EVENT,
                IndexSpec {
                    name: "userId",
                    key_path: "userId",
                },
            ],
        },
        StoreSchema {
            name: stores::SYNC_META,
            key_path: "key",
            indexes: &[],
        },
        StoreSchema {
            name: stores::MUTATION_QUEUE,
            key_path: "id",
            indexes: &[
                IndexSpec {
                    name: "status",
                    key_path: "status",
                },
                IndexSpec {
                    name: "createdAt",
                    key_path: "createdAt",
                },
            ],
        },
    ],
};

/// Schema of the dedicated cache snapshot database.
pub const CACHE_SCHEMA: DatabaseSchema = DatabaseSchema {
    name: "tether-cache",
    version: 1,
    stores: &[StoreSchema {
        name: stores::SNAPSHOTS,
        key_path: "key",
        indexes: &[],
    }],
};

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
