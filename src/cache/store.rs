//! Filesystem layer for cached responses
//!
//! Stores one JSON file per cache key in a single flat directory. Writes go
//! to a uniquely named temp file in the same directory which is then renamed
//! over the target, so a reader always sees either the previous complete
//! entry or the new complete entry.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::entry::CacheEntry;
use crate::error::{is_ignorable_io, CacheIoError};

/// Result of looking up a key on disk
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// No file for this key
    Missing,
    /// A parseable entry that has not expired
    Fresh(CacheEntry),
    /// A parseable entry past its expiry
    Stale,
    /// A file whose content is not a valid entry
    Corrupt,
}

/// Reads and writes cache entries under a single directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheStore {
    /// Creates a store rooted at `cache_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    /// Reads and classifies the entry stored under `key`
    ///
    /// # Returns
    /// * `Ok(Lookup)` describing what was found, including corrupt content
    /// * `Err(CacheIoError)` only for I/O failures other than "not found"
    pub async fn read(&self, key: &str) -> Result<Lookup, CacheIoError> {
        let path = self.path_for(key);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if is_ignorable_io(&e) => return Ok(Lookup::Missing),
            Err(source) => return Err(CacheIoError::Read { path, source }),
        };

        let entry: CacheEntry = match serde_json::from_slice(&content) {
            Ok(entry) => entry,
            Err(_) => return Ok(Lookup::Corrupt),
        };

        if entry.is_fresh() {
            Ok(Lookup::Fresh(entry))
        } else {
            Ok(Lookup::Stale)
        }
    }

    /// Writes `entry` under `key` via temp file and atomic rename
    ///
    /// Creates the cache directory if it does not exist.
    pub async fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheIoError> {
        let json = serde_json::to_vec(entry)?;
        let dir = self.cache_dir.clone();
        let target = self.path_for(key);

        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &json))
            .await
            .map_err(|e| CacheIoError::Task(e.to_string()))?
    }

    /// Deletes the entry stored under `key`
    ///
    /// A file that is already gone is not an error.
    pub async fn remove(&self, key: &str) -> Result<(), CacheIoError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if is_ignorable_io(&e) => Ok(()),
            Err(source) => Err(CacheIoError::Remove { path, source }),
        }
    }
}

fn write_atomic(dir: &Path, target: &Path, content: &[u8]) -> Result<(), CacheIoError> {
    let write_err = |source| CacheIoError::Write {
        path: target.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    temp.write_all(content).map_err(write_err)?;
    temp.flush().map_err(write_err)?;

    temp.persist(target).map_err(|e| CacheIoError::Rename {
        path: target.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::new(temp_dir.path());
        (store, temp_dir)
    }

    fn file_names(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .expect("Should list cache dir")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_write_creates_file_named_by_key() {
        let (store, temp_dir) = create_test_store();
        let entry = CacheEntry::new(json!({"price": "1.23"}), 30);

        store.write("12345", &entry).await.expect("Write should succeed");

        assert_eq!(file_names(temp_dir.path()), vec!["12345".to_string()]);
        let content = std::fs::read_to_string(temp_dir.path().join("12345")).unwrap();
        let stored: CacheEntry = serde_json::from_str(&content).unwrap();
        assert_eq!(stored, entry);
    }

    #[tokio::test]
    async fn test_read_returns_missing_for_absent_key() {
        let (store, _temp_dir) = create_test_store();
        assert_eq!(store.read("nope").await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_read_returns_missing_when_dir_does_not_exist() {
        let temp_dir = TempDir::new().unwrap();
        let store = CacheStore::new(temp_dir.path().join("not-created"));
        assert_eq!(store.read("1").await.unwrap(), Lookup::Missing);
    }

    #[tokio::test]
    async fn test_read_returns_fresh_entry() {
        let (store, _temp_dir) = create_test_store();
        let entry = CacheEntry::new(json!([1, 2, 3]), 60);
        store.write("k", &entry).await.unwrap();

        assert_eq!(store.read("k").await.unwrap(), Lookup::Fresh(entry));
    }

    #[tokio::test]
    async fn test_read_classifies_expired_entry_as_stale() {
        let (store, temp_dir) = create_test_store();
        std::fs::write(
            temp_dir.path().join("k"),
            r#"{"data":{"price":"0.50"},"expiry":1000}"#,
        )
        .unwrap();

        assert_eq!(store.read("k").await.unwrap(), Lookup::Stale);
    }

    #[tokio::test]
    async fn test_read_classifies_garbage_as_corrupt() {
        let (store, temp_dir) = create_test_store();
        std::fs::write(temp_dir.path().join("k"), "not json at all").unwrap();

        assert_eq!(store.read("k").await.unwrap(), Lookup::Corrupt);
    }

    #[tokio::test]
    async fn test_read_classifies_wrong_shape_as_corrupt() {
        let (store, temp_dir) = create_test_store();
        std::fs::write(temp_dir.path().join("k"), r#"{"data":1}"#).unwrap();

        assert_eq!(store.read("k").await.unwrap(), Lookup::Corrupt);
    }

    #[tokio::test]
    async fn test_read_reports_io_error_when_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = CacheStore::new(&blocker);

        let err = store.read("k").await.expect_err("Read through a file should fail");
        assert!(!err.is_ignorable());
    }

    #[tokio::test]
    async fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("request-cache");
        let store = CacheStore::new(&nested);

        store
            .write("k", &CacheEntry::new(json!(null), 10))
            .await
            .expect("Write should succeed");

        assert!(nested.join("k").exists());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_single_complete_file() {
        let (store, temp_dir) = create_test_store();
        store.write("k", &CacheEntry::new(json!("first"), 10)).await.unwrap();
        let second = CacheEntry::new(json!("second"), 10);
        store.write("k", &second).await.unwrap();

        assert_eq!(file_names(temp_dir.path()), vec!["k".to_string()]);
        assert_eq!(store.read("k").await.unwrap(), Lookup::Fresh(second));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reader_never_sees_partial_write() {
        let (store, temp_dir) = create_test_store();
        let big = |fill: char| CacheEntry::new(json!(fill.to_string().repeat(1 << 20)), 60);

        let writers: Vec<_> = ['a', 'b', 'c']
            .into_iter()
            .map(|fill| {
                let store = store.clone();
                let entry = big(fill);
                tokio::spawn(async move {
                    for _ in 0..10 {
                        store.write("k", &entry).await.expect("Write should succeed");
                    }
                })
            })
            .collect();

        while writers.iter().any(|w| !w.is_finished()) {
            match store.read("k").await.expect("Read should succeed") {
                Lookup::Missing => {}
                Lookup::Fresh(entry) => {
                    let text = entry.data.as_str().expect("data is a string");
                    assert_eq!(text.len(), 1 << 20);
                    let first = text.chars().next().unwrap();
                    assert!(text.chars().all(|c| c == first), "Entry mixes two writes");
                }
                other => panic!("Reader observed {other:?} during concurrent writes"),
            }
        }
        for writer in writers {
            writer.await.unwrap();
        }

        assert!(matches!(store.read("k").await.unwrap(), Lookup::Fresh(_)));
        assert_eq!(file_names(temp_dir.path()), vec!["k".to_string()]);
        assert!(file_names(temp_dir.path()).iter().all(|n| !n.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let (store, temp_dir) = create_test_store();
        store.write("k", &CacheEntry::new(json!(1), 10)).await.unwrap();

        store.remove("k").await.expect("Remove should succeed");

        assert!(!temp_dir.path().join("k").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let (store, _temp_dir) = create_test_store();
        store.remove("never-written").await.expect("Missing file is not an error");
    }
}
