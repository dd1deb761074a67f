//! The KV facade (§4.F) — a process-wide store guarded by a single
//! mutex. Every public operation acquires the mutex, performs exactly
//! one store operation, and releases it; `get`/`exists`/`size` only
//! hold the lock for the copy-out phase, since [`HashTable::get`]
//! already materializes an owned [`Value`] before returning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kvstore_core::codec::{self, CodecError};
use kvstore_core::{ByteSpan, EngineError, EngineResult, HashTable, Tag, Value};
use thiserror::Error;

/// Errors from the facade layer — the engine's own errors, plus
/// persistence I/O.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("snapshot I/O error: {0}")]
    Io(String),

    #[error("snapshot format error: {0}")]
    Format(String),
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Io(io_err) => StoreError::Io(io_err.to_string()),
            other => StoreError::Format(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A snapshot of table-wide numbers for STATS/INFO.
pub struct TableStats {
    pub keys: usize,
    pub bucket_count: usize,
    pub load_factor: f64,
    pub arena_bytes_in_use: usize,
}

/// The thread-safe store facade. Cheap to clone — internally an
/// `Arc<Mutex<HashTable>>` — so every connection task can hold its
/// own handle.
#[derive(Clone)]
pub struct Store {
    inner: std::sync::Arc<Mutex<HashTable>>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Store {
            inner: std::sync::Arc::new(Mutex::new(HashTable::with_capacity(capacity))),
        }
    }

    pub fn put(&self, key: &[u8], value: &Value) -> EngineResult<()> {
        self.inner.lock().unwrap().put(key, value)
    }

    pub fn get(&self, key: &[u8]) -> EngineResult<Value> {
        self.inner.lock().unwrap().get(key)
    }

    pub fn type_of(&self, key: &[u8]) -> EngineResult<Tag> {
        self.inner.lock().unwrap().type_of(key)
    }

    pub fn delete(&self, key: &[u8]) -> bool {
        self.inner.lock().unwrap().delete(key)
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.inner.lock().unwrap().exists(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    /// All keys, in bucket-then-chain iteration order (§4.L KEYS).
    pub fn keys(&self) -> Vec<ByteSpan> {
        self.inner.lock().unwrap().iter().map(|(k, _)| k).collect()
    }

    pub fn stats(&self) -> TableStats {
        let table = self.inner.lock().unwrap();
        TableStats {
            keys: table.len(),
            bucket_count: table.bucket_count(),
            load_factor: table.load_factor(),
            arena_bytes_in_use: table.arena_bytes_in_use(),
        }
    }

    /// Write a snapshot to `path`. Not guaranteed atomic by the
    /// format itself (§4.E), but this implementation writes to a
    /// sibling temp file and renames over the destination — the
    /// strengthening §4.E explicitly allows and §9 recommends, and
    /// the same tmp-then-rename idiom this codebase already uses for
    /// its content-addressed cache writes.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let tmp_path = tmp_path_for(path);
        {
            let mut file = fs::File::create(&tmp_path)?;
            let table = self.inner.lock().unwrap();
            codec::write_snapshot(&mut file, &table)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Write a timestamped backup copy alongside `path`, named
    /// `<path>.backup.<YYYYMMDD-HHMMSS>` (§6).
    pub fn backup(&self, path: impl AsRef<Path>, timestamp: &str) -> StoreResult<PathBuf> {
        let path = path.as_ref();
        let mut backup_name = path.as_os_str().to_owned();
        backup_name.push(format!(".backup.{timestamp}"));
        let backup_path = PathBuf::from(backup_name);
        self.save(&backup_path)?;
        Ok(backup_path)
    }

    /// Load a snapshot from `path`, replacing the store's contents.
    /// A missing file is not an error — the store is left empty, a
    /// deliberate bootstrapping convenience (§4.E, §7).
    pub fn load(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            self.clear();
            return Ok(());
        }
        let mut file = fs::File::open(path)?;
        let mut table = self.inner.lock().unwrap();
        codec::read_snapshot(&mut file, &mut table)?;
        Ok(())
    }

    /// Save iff the store is non-empty — the shutdown auto-save
    /// policy from §4.F.
    pub fn auto_save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.save(path)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(bytes: &[u8]) -> Value {
        Value::String(ByteSpan::from_slice(bytes))
    }

    #[test]
    fn put_get_delete_exists_round_trip() {
        let store = Store::new();
        store.put(b"name", &s(b"Alice")).unwrap();
        assert_eq!(store.get(b"name").unwrap(), s(b"Alice"));
        assert!(store.exists(b"name"));
        assert!(store.delete(b"name"));
        assert!(store.get(b"name").is_err());
        assert!(!store.exists(b"name"));
    }

    #[test]
    fn save_then_load_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.db");

        let store = Store::new();
        store.put(b"a", &Value::Int64(1)).unwrap();
        store.put(b"b", &s(b"two")).unwrap();
        store.put(b"c", &Value::Bool(true)).unwrap();
        store.save(&path).unwrap();

        let restored = Store::new();
        restored.load(&path).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.get(b"a").unwrap(), Value::Int64(1));
        assert_eq!(restored.get(b"b").unwrap(), s(b"two"));
        assert_eq!(restored.get(b"c").unwrap(), Value::Bool(true));
    }

    #[test]
    fn load_of_missing_file_leaves_store_empty_without_error() {
        let store = Store::new();
        store.put(b"k", &s(b"v")).unwrap();
        store.load("/nonexistent/path/does-not-exist.db").unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn clear_then_put_still_works() {
        let store = Store::new();
        store.put(b"k", &s(b"v")).unwrap();
        store.clear();
        assert_eq!(store.len(), 0);
        store.put(b"k2", &s(b"v2")).unwrap();
        assert_eq!(store.get(b"k2").unwrap(), s(b"v2"));
    }

    #[test]
    fn backup_writes_a_timestamped_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.db");
        let store = Store::new();
        store.put(b"k", &s(b"v")).unwrap();
        let backup_path = store.backup(&path, "20260101-000000").unwrap();
        assert!(backup_path.exists());
        assert_eq!(
            backup_path.file_name().unwrap().to_str().unwrap(),
            "snap.db.backup.20260101-000000"
        );
    }
}
