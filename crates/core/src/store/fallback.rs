// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Degraded fallback store over a flat string map.
//!
//! Modeled on a browser-style key/value bag: one string value per string key
//! and no native indexes. Indexes are emulated with explicit id-list records
//! maintained by the same write path as the records themselves:
//!
//! ```text
//! {db}:rec:{store}:{id}             -> record JSON
//! {db}:idx:{store}:{index}:{value}  -> ["id1", "id2", ...]
//! ```
//!
//! The map lives in memory and, when a path is given, is mirrored to a JSON
//! file. File-backed operations hold an advisory lock on a sidecar
//! `.lock` file (shared for reads, exclusive for writes) and reload the
//! file first, which serializes read-modify-write across processes.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde_json::Value;

use super::{Change, KvBackend};
use crate::error::{Error, Result};
use crate::schema::{DatabaseSchema, StoreSchema};

type Entries = BTreeMap<String, String>;

/// Fallback backend emulating indexes with id-list records.
pub struct FallbackBackend {
    schema: &'static DatabaseSchema,
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

impl FallbackBackend {
    /// Creates a purely in-memory fallback.
    pub fn in_memory(schema: &'static DatabaseSchema) -> Self {
        FallbackBackend {
            schema,
            path: None,
            entries: Mutex::new(Entries::new()),
        }
    }

    /// Creates a fallback mirrored to the JSON file at `path`.
    ///
    /// The file is read lazily; a missing file is an empty store.
    pub fn open(schema: &'static DatabaseSchema, path: &Path) -> Self {
        FallbackBackend {
            schema,
            path: Some(path.to_path_buf()),
            entries: Mutex::new(Entries::new()),
        }
    }

    /// Returns the mirror file path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn rec_prefix(&self, store: &str) -> String {
        format!("{}:rec:{}:", self.schema.name, store)
    }

    fn rec_key(&self, store: &str, id: &str) -> String {
        format!("{}{}", self.rec_prefix(store), id)
    }

    fn idx_prefix(&self, store: &str) -> String {
        format!("{}:idx:{}:", self.schema.name, store)
    }

    fn idx_key(&self, store: &str, index: &str, value: &str) -> String {
        format!("{}{}:{}", self.idx_prefix(store), index, value)
    }

    fn lock_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn lock_file(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(Self::lock_path(path))?)
    }

    fn load(path: &Path) -> Result<Entries> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Entries::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically replaces the mirror file (write temp, fsync, rename).
    fn save(path: &Path, entries: &Entries) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let file = File::create(&tmp)?;
        serde_json::to_writer(&file, entries)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Entries) -> Result<T>) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Unavailable("fallback store lock poisoned".into()))?;

        let Some(path) = self.path.as_deref() else {
            return f(&entries);
        };

        let lock = Self::lock_file(path)?;
        lock.lock_shared()?;
        let result = Self::load(path).and_then(|loaded| {
            *entries = loaded;
            f(&entries)
        });
        let _ = FileExt::unlock(&lock);
        result
    }

    fn write<T>(&self, f: impl FnOnce(&mut Entries) -> Result<T>) -> Result<T> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Unavailable("fallback store lock poisoned".into()))?;

        let Some(path) = self.path.as_deref() else {
            // Work on a copy so a failed write leaves nothing half-applied.
            let mut next = entries.clone();
            let value = f(&mut next)?;
            *entries = next;
            return Ok(value);
        };

        let lock = Self::lock_file(path)?;
        lock.lock_exclusive()?;
        let result = Self::load(path).and_then(|mut loaded| {
            let value = f(&mut loaded)?;
            Self::save(path, &loaded)?;
            *entries = loaded;
            Ok(value)
        });
        let _ = FileExt::unlock(&lock);
        result
    }

    fn read_ids(entries: &Entries, key: &str) -> Result<Vec<String>> {
        match entries.get(key) {
            Some(text) => Ok(serde_json::from_str(text)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_ids(entries: &mut Entries, key: String, ids: Vec<String>) -> Result<()> {
        if ids.is_empty() {
            entries.remove(&key);
        } else {
            entries.insert(key, serde_json::to_string(&ids)?);
        }
        Ok(())
    }

    fn add_to_indexes(
        &self,
        entries: &mut Entries,
        store: &StoreSchema,
        id: &str,
        record: &Value,
    ) -> Result<()> {
        for (index, value) in store.index_entries(record) {
            let key = self.idx_key(store.name, index, &value);
            let mut ids = Self::read_ids(entries, &key)?;
            if let Err(pos) = ids.binary_search_by(|existing| existing.as_str().cmp(id)) {
                ids.insert(pos, id.to_string());
            }
            Self::write_ids(entries, key, ids)?;
        }
        Ok(())
    }

    fn remove_from_indexes(
        &self,
        entries: &mut Entries,
        store: &StoreSchema,
        id: &str,
        record: &Value,
    ) -> Result<()> {
        for (index, value) in store.index_entries(record) {
            let key = self.idx_key(store.name, index, &value);
            let mut ids = Self::read_ids(entries, &key)?;
            ids.retain(|existing| existing != id);
            Self::write_ids(entries, key, ids)?;
        }
        Ok(())
    }

    fn get_record(&self, entries: &Entries, store: &str, id: &str) -> Result<Option<Value>> {
        entries
            .get(&self.rec_key(store, id))
            .map(|text| serde_json::from_str(text).map_err(Error::from))
            .transpose()
    }

    fn put_record(&self, entries: &mut Entries, store: &StoreSchema, record: &Value) -> Result<()> {
        let id = store.key_of(record)?;
        if let Some(previous) = self.get_record(entries, store.name, &id)? {
            self.remove_from_indexes(entries, store, &id, &previous)?;
        }
        entries.insert(self.rec_key(store.name, &id), serde_json::to_string(record)?);
        self.add_to_indexes(entries, store, &id, record)
    }

    fn delete_record(&self, entries: &mut Entries, store: &StoreSchema, id: &str) -> Result<()> {
        if let Some(previous) = self.get_record(entries, store.name, id)? {
            self.remove_from_indexes(entries, store, id, &previous)?;
            entries.remove(&self.rec_key(store.name, id));
        }
        Ok(())
    }

    fn prefixed<'a>(
        entries: &'a Entries,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        entries
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
    }
}

impl KvBackend for FallbackBackend {
    fn put(&self, store: &str, record: &Value) -> Result<()> {
        let store = self.schema.store(store)?;
        self.write(|entries| self.put_record(entries, store, record))
    }

    fn get(&self, store: &str, id: &str) -> Result<Option<Value>> {
        let store = self.schema.store(store)?;
        self.read(|entries| self.get_record(entries, store.name, id))
    }

    fn get_all(&self, store: &str) -> Result<Vec<Value>> {
        let store = self.schema.store(store)?;
        let prefix = self.rec_prefix(store.name);
        self.read(|entries| {
            Self::prefixed(entries, &prefix)
                .map(|(_, text)| serde_json::from_str(text).map_err(Error::from))
                .collect()
        })
    }

    fn get_by_index(&self, store: &str, index: &str, value: &str) -> Result<Vec<Value>> {
        let store = self.schema.store(store)?;
        let index = store.index(index)?;
        let key = self.idx_key(store.name, index.name, value);
        self.read(|entries| {
            let mut records = Vec::new();
            for id in Self::read_ids(entries, &key)? {
                match self.get_record(entries, store.name, &id)? {
                    Some(record) => records.push(record),
                    None => tracing::debug!(store = store.name, id, "index points at missing record"),
                }
            }
            Ok(records)
        })
    }

    fn delete(&self, store: &str, id: &str) -> Result<()> {
        let store = self.schema.store(store)?;
        self.write(|entries| self.delete_record(entries, store, id))
    }

    fn clear(&self, store: &str) -> Result<()> {
        let store = self.schema.store(store)?;
        let rec_prefix = self.rec_prefix(store.name);
        let idx_prefix = self.idx_prefix(store.name);
        self.write(|entries| {
            entries.retain(|key, _| !key.starts_with(&rec_prefix) && !key.starts_with(&idx_prefix));
            Ok(())
        })
    }

    fn count(&self, store: &str, index: Option<(&str, &str)>) -> Result<usize> {
        let store = self.schema.store(store)?;
        match index {
            Some((name, value)) => {
                let key = self.idx_key(store.name, store.index(name)?.name, value);
                self.read(|entries| Ok(Self::read_ids(entries, &key)?.len()))
            }
            None => {
                let prefix = self.rec_prefix(store.name);
                self.read(|entries| Ok(Self::prefixed(entries, &prefix).count()))
            }
        }
    }

    fn update(
        &self,
        store: &str,
        id: &str,
        apply: &mut dyn FnMut(Option<Value>) -> Change<Value>,
    ) -> Result<bool> {
        let store = self.schema.store(store)?;
        self.write(|entries| {
            let current = self.get_record(entries, store.name, id)?;
            let existed = current.is_some();
            match apply(current) {
                Change::Keep => Ok(false),
                Change::Put(next) => {
                    if store.key_of(&next)? != id {
                        return Err(Error::CorruptedData(format!(
                            "update of '{id}' in '{}' changed the record key",
                            store.name
                        )));
                    }
                    self.put_record(entries, store, &next)?;
                    Ok(true)
                }
                Change::Delete => {
                    self.delete_record(entries, store, id)?;
                    Ok(existed)
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "fallback_tests.rs"]
mod tests;
