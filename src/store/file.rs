// ABOUTME: AppStore persisted as a single JSON document on disk.
// ABOUTME: Writes hold a lock file and go through temp file + rename, off the async runtime.

use super::collection::Collection;
use super::{AppFilter, AppStore, StoreError};
use crate::app::{AppRecord, AppUpdate};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Whole-collection JSON file. Other processes may edit the file between calls,
/// so nothing is cached.
///
/// Read-modify-write cycles hold an exclusive `flock` on `{path}.lock`, which serializes
/// writers across processes as well as across stores opened on the same path. Readers
/// take no lock: the rename keeps every read on a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Disk access runs on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || f(path.as_path()))
            .await
            .map_err(|e| io_error(self.path(), std::io::Error::other(e)))?
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn load(path: &Path) -> Result<Collection, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Collection::default()),
        Err(e) => return Err(io_error(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Collection::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn save(path: &Path, collection: &Collection) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(collection).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = sibling(path, ".tmp");
    std::fs::write(&tmp, json).map_err(|e| io_error(path, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

// Released when the returned file is closed.
fn lock_exclusive(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
    }
    let lock = sibling(path, ".lock");
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock)
        .map_err(|e| io_error(&lock, e))?;
    file.lock_exclusive().map_err(|e| io_error(&lock, e))?;
    Ok(file)
}

fn mutate<T>(
    path: &Path,
    f: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let _lock = lock_exclusive(path)?;
    let mut collection = load(path)?;
    let value = f(&mut collection)?;
    save(path, &collection)?;
    Ok(value)
}

#[async_trait]
impl AppStore for JsonFileStore {
    async fn find_one(&self, filter: &AppFilter) -> Result<Option<AppRecord>, StoreError> {
        let filter = filter.clone();
        self.blocking(move |path| Ok(load(path)?.find_one(&filter)))
            .await
    }

    async fn insert_one(&self, record: AppRecord) -> Result<(), StoreError> {
        self.blocking(move |path| mutate(path, |c| c.insert(record)))
            .await
    }

    async fn update_one(
        &self,
        filter: &AppFilter,
        update: &AppUpdate,
    ) -> Result<AppRecord, StoreError> {
        let (filter, update) = (filter.clone(), update.clone());
        self.blocking(move |path| mutate(path, |c| c.update(&filter, &update)))
            .await
    }

    async fn delete_one(&self, filter: &AppFilter) -> Result<bool, StoreError> {
        let filter = filter.clone();
        self.blocking(move |path| mutate(path, |c| Ok(c.delete(&filter))))
            .await
    }

    async fn find(&self, filter: &AppFilter) -> Result<Vec<AppRecord>, StoreError> {
        let filter = filter.clone();
        self.blocking(move |path| Ok(load(path)?.find(&filter)))
            .await
    }
}
