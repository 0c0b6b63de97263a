// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed primary store.
//!
//! All logical stores share two tables: `records` holds the JSON bodies and
//! `index_entries` holds one row per (index, value, record). The schema
//! version lives in `PRAGMA user_version`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::Value;

use super::{Change, KvBackend};
use crate::error::{Error, Result};
use crate::schema::{DatabaseSchema, StoreSchema};

/// SQL schema shared by every database this backend opens.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    store TEXT NOT NULL,
    id TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (store, id)
);

CREATE TABLE IF NOT EXISTS index_entries (
    store TEXT NOT NULL,
    index_name TEXT NOT NULL,
    value TEXT NOT NULL,
    id TEXT NOT NULL,
    PRIMARY KEY (store, index_name, value, id)
);

CREATE INDEX IF NOT EXISTS idx_index_entries_record ON index_entries(store, id);
"#;

/// Run schema creation and the index migration pass on a connection.
///
/// When the file's `user_version` is older than the declared schema, every
/// index entry is rebuilt from the stored records so newly declared indexes
/// cover existing data. Returns the version the file is at afterwards.
pub fn run_migrations(conn: &mut Connection, schema: &DatabaseSchema) -> Result<u32> {
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let stored: u32 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if stored > schema.version {
        tracing::warn!(
            db = schema.name,
            stored,
            declared = schema.version,
            "database was upgraded by a newer writer"
        );
        tx.commit()?;
        return Ok(stored);
    }

    if stored < schema.version {
        rebuild_indexes(&tx, schema)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", schema.version))?;
        tracing::info!(
            db = schema.name,
            from = stored,
            to = schema.version,
            "migrated store schema"
        );
    }

    tx.commit()?;
    Ok(schema.version)
}

/// Migration: recompute every index entry from the records table.
fn rebuild_indexes(tx: &Transaction<'_>, schema: &DatabaseSchema) -> Result<()> {
    tx.execute("DELETE FROM index_entries", [])?;

    for store in schema.stores {
        let rows = {
            let mut stmt = tx.prepare("SELECT id, value FROM records WHERE store = ?1")?;
            let rows = stmt
                .query_map(params![store.name], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        for (id, text) in rows {
            let record: Value = serde_json::from_str(&text)?;
            insert_index_entries(tx, store, &id, &record)?;
        }
    }
    Ok(())
}

fn insert_index_entries(
    conn: &Connection,
    store: &StoreSchema,
    id: &str,
    record: &Value,
) -> Result<()> {
    for (index, value) in store.index_entries(record) {
        conn.execute(
            "INSERT OR IGNORE INTO index_entries (store, index_name, value, id)
             VALUES (?1, ?2, ?3, ?4)",
            params![store.name, index, value, id],
        )?;
    }
    Ok(())
}

fn write_record(conn: &Connection, store: &StoreSchema, record: &Value) -> Result<()> {
    let id = store.key_of(record)?;
    conn.execute(
        "INSERT OR REPLACE INTO records (store, id, value) VALUES (?1, ?2, ?3)",
        params![store.name, id, serde_json::to_string(record)?],
    )?;
    conn.execute(
        "DELETE FROM index_entries WHERE store = ?1 AND id = ?2",
        params![store.name, id],
    )?;
    insert_index_entries(conn, store, &id, record)
}

fn read_record(conn: &Connection, store: &str, id: &str) -> Result<Option<Value>> {
    let text: Option<String> = conn
        .query_row(
            "SELECT value FROM records WHERE store = ?1 AND id = ?2",
            params![store, id],
            |row| row.get(0),
        )
        .optional()?;
    text.map(|t| serde_json::from_str(&t).map_err(Error::from))
        .transpose()
}

/// Returns true if a record was removed.
fn delete_record(conn: &Connection, store: &str, id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM records WHERE store = ?1 AND id = ?2",
        params![store, id],
    )?;
    conn.execute(
        "DELETE FROM index_entries WHERE store = ?1 AND id = ?2",
        params![store, id],
    )?;
    Ok(removed > 0)
}

fn parse_all(rows: Vec<String>) -> Result<Vec<Value>> {
    rows.iter()
        .map(|text| serde_json::from_str(text).map_err(Error::from))
        .collect()
}

/// A memoized connection and the schema version it was opened at.
struct Handle {
    conn: Connection,
    version: u32,
}

impl Handle {
    /// False once another writer has changed the file's schema version.
    fn is_current(&self) -> bool {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))
            .map(|v| v == self.version)
            .unwrap_or(false)
    }
}

/// Primary durable backend over a SQLite file.
///
/// The connection is opened lazily on first use and memoized. Before each
/// operation the file's `user_version` is compared with the memoized one; a
/// mismatch means another process migrated the file, so the handle is
/// dropped and the operation reopens (and re-migrates) cleanly.
pub struct SqliteBackend {
    schema: &'static DatabaseSchema,
    /// `None` for an in-memory database, which is never reopened.
    path: Option<PathBuf>,
    handle: Mutex<Option<Handle>>,
}

impl SqliteBackend {
    /// Creates a backend for the database file at `path`. Nothing is opened
    /// until the first operation.
    pub fn new(path: &Path, schema: &'static DatabaseSchema) -> Self {
        SqliteBackend {
            schema,
            path: Some(path.to_path_buf()),
            handle: Mutex::new(None),
        }
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory(schema: &'static DatabaseSchema) -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        let version = run_migrations(&mut conn, schema)?;
        Ok(SqliteBackend {
            schema,
            path: None,
            handle: Mutex::new(Some(Handle { conn, version })),
        })
    }

    /// Returns the database path, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Opens the connection now instead of on first use.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|_| Ok(()))
    }

    fn open_handle(&self) -> Result<Handle> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| Error::Unavailable("in-memory database was closed".into()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Unavailable(format!("{}: {e}", parent.display())))?;
            }
        }

        let open = || -> Result<Handle> {
            let mut conn = Connection::open(path)?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            let version = run_migrations(&mut conn, self.schema)?;
            Ok(Handle { conn, version })
        };

        open().map_err(|e| Error::Unavailable(format!("{}: {e}", path.display())))
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| Error::Unavailable("sqlite handle lock poisoned".into()))?;

        if self.path.is_some() {
            if let Some(handle) = guard.as_ref() {
                if !handle.is_current() {
                    tracing::debug!(db = self.schema.name, "schema version changed, reopening");
                    *guard = None;
                }
            }
        }

        if guard.is_none() {
            *guard = Some(self.open_handle()?);
        }

        match guard.as_mut() {
            Some(handle) => f(&mut handle.conn),
            None => Err(Error::Unavailable("sqlite handle missing".into())),
        }
    }
}

impl KvBackend for SqliteBackend {
    fn put(&self, store: &str, record: &Value) -> Result<()> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            write_record(&tx, store, record)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| read_record(conn, store.name, id))
    }

    fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM records WHERE store = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map(params![store.name], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            parse_all(rows)
        })
    }

    fn get_by_index(&self, store: &str, index: &str, value: &str) -> Result<Vec<Value>> {
        let store = self.schema.store(store)?;
        let index = store.index(index)?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.value FROM index_entries i
                 JOIN records r ON r.store = i.store AND r.id = i.id
                 WHERE i.store = ?1 AND i.index_name = ?2 AND i.value = ?3
                 ORDER BY r.id",
            )?;
            let rows = stmt
                .query_map(params![store.name, index.name, value], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            parse_all(rows)
        })
    }

    fn delete(&self, store: &str, id: &str) -> Result<()> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            delete_record(&tx, store.name, id)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn clear(&self, store: &str) -> Result<()> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM records WHERE store = ?1", params![store.name])?;
            tx.execute("DELETE FROM index_entries WHERE store = ?1", params![store.name])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn count(&self, store: &str, index: Option<(&str, &str)>) -> Result<usize> {
        let store = self.schema.store(store)?;
        let index = match index {
            Some((name, value)) => Some((store.index(name)?.name, value)),
            None => None,
        };
        self.with_conn(|conn| {
            let count: i64 = match index {
                Some((name, value)) => conn.query_row(
                    "SELECT COUNT(*) FROM index_entries
                     WHERE store = ?1 AND index_name = ?2 AND value = ?3",
                    params![store.name, name, value],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM records WHERE store = ?1",
                    params![store.name],
                    |row| row.get(0),
                )?,
            };
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    fn update(
        &self,
        store: &str,
        id: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Change<Value>,
    ) -> Result<bool> {
        let store = self.schema.store(store)?;
        self.with_conn(|conn| {
            // IMMEDIATE takes the write lock before the read, so two
            // connections can never both observe the same pre-image.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = read_record(&tx, store.name, id)?;

            let changed = match apply(current) {
                Change::Keep => return Ok(false),
                Change::Put(next) => {
                    if store.key_of(&next)? != id {
                        return Err(Error::CorruptedData(format!(
                            "update of '{id}' in '{}' changed the record key",
                            store.name
                        )));
                    }
                    write_record(&tx, store, &next)?;
                    true
                }
                Change::Delete => delete_record(&tx, store.name, id)?,
            };
            tx.commit()?;
            Ok(changed)
        })
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
