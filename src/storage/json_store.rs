//! Generic JSON-file collection
//!
//! Each collection is a single JSON array on disk mirrored by an in-memory
//! cache. Every mutation rewrites the file through a temporary file that is
//! renamed over the original, so a crash never leaves a half-written store.

use crate::error::{NymgraphError, Result, StringError};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A record that can live in a [`JsonStore`]
pub trait Record: Clone + Serialize + DeserializeOwned + Send {
    /// Primary key
    fn id(&self) -> Uuid;
}

/// File-backed collection of records
///
/// All methods take `&self`; writers are serialized by the internal lock,
/// which is also held while the file is rewritten.
#[derive(Debug)]
pub struct JsonStore<T> {
    path: PathBuf,
    records: Mutex<Vec<T>>,
}

impl<T: Record> JsonStore<T> {
    /// Open the collection at `path`, reading it if it exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = read_records(&path)?;
        debug!("Opened {} with {} records", path.display(), records.len());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file, replacing the cache
    ///
    /// On error the cache is left untouched.
    pub fn load_all(&self) -> Result<Vec<T>> {
        let mut guard = self.records.lock();
        let records = read_records(&self.path)?;
        *guard = records.clone();
        Ok(records)
    }

    /// Snapshot of all cached records
    pub fn all(&self) -> Vec<T> {
        self.records.lock().clone()
    }

    /// Cached records matching `predicate`
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.records
            .lock()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Record with the given id
    pub fn find(&self, id: Uuid) -> Option<T> {
        self.records.lock().iter().find(|r| r.id() == id).cloned()
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Append a record
    pub fn insert(&self, record: T) -> Result<()> {
        self.mutate(|records| {
            records.push(record);
        })
    }

    /// Apply `f` to the record with `id`, returning the updated record
    ///
    /// Returns `Ok(None)` without touching the file when no record matches.
    pub fn update(&self, id: Uuid, f: impl FnOnce(&mut T)) -> Result<Option<T>> {
        let mut guard = self.records.lock();
        let Some(index) = guard.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let mut next = guard.clone();
        f(&mut next[index]);
        let updated = next[index].clone();
        write_records(&self.path, &next)?;
        *guard = next;
        Ok(Some(updated))
    }

    /// Remove the record with `id`, returning it
    pub fn remove(&self, id: Uuid) -> Result<Option<T>> {
        let mut guard = self.records.lock();
        let Some(index) = guard.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let mut next = guard.clone();
        let removed = next.remove(index);
        write_records(&self.path, &next)?;
        *guard = next;
        Ok(Some(removed))
    }

    /// Keep only records matching `keep`, returning how many were removed
    pub fn retain(&self, keep: impl Fn(&T) -> bool) -> Result<usize> {
        let mut guard = self.records.lock();
        let next: Vec<T> = guard.iter().filter(|r| keep(r)).cloned().collect();
        let removed = guard.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }
        write_records(&self.path, &next)?;
        *guard = next;
        Ok(removed)
    }

    /// Remove every record
    pub fn truncate(&self) -> Result<()> {
        self.mutate(Vec::clear)
    }

    /// Run a change that may be rejected, under the store lock
    ///
    /// `f` edits a copy of the records. The file and cache are only replaced
    /// when it returns `Ok`.
    pub fn transact<R>(&self, f: impl FnOnce(&mut Vec<T>) -> Result<R>) -> Result<R> {
        let mut guard = self.records.lock();
        let mut next = guard.clone();
        let result = f(&mut next)?;
        write_records(&self.path, &next)?;
        *guard = next;
        Ok(result)
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<T>)) -> Result<()> {
        self.transact(|records| {
            f(records);
            Ok(())
        })
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path)?;
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&json).map_err(|e| {
        NymgraphError::StorageError(StringError::new(format!(
            "{} is corrupted: {e}",
            path.display()
        )))
    })
}

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| NymgraphError::StorageError(StringError::new("Invalid store path")))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, records)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|e| NymgraphError::StorageError(Box::new(e)))?;
    Ok(())
}
