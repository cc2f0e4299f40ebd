//! Read-through caches owned by the loaders.
//!
//! [`FileCache`] keys each parsed file on its modification time and reloads it
//! whenever the mtime on disk no longer matches. [`ScanCache`] holds the result
//! of a whole directory scan and is only ever dropped by [`ScanCache::invalidate`];
//! anything that mutates a scanned directory must call it before cached reads are
//! accurate again.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{HistoryError, Result};

struct Slot<T> {
    mtime: SystemTime,
    value: Arc<T>,
}

pub struct FileCache<T> {
    slots: RwLock<HashMap<PathBuf, Slot<T>>>,
    loads: AtomicUsize,
}

impl<T> Default for FileCache<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }
}

impl<T> FileCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached parse of `path` if its mtime is unchanged, otherwise
    /// run `load` and remember the result under the current mtime. `load` is
    /// handed the mtime the slot will be keyed on.
    pub async fn get_or_load<F, Fut>(&self, path: &Path, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(SystemTime) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mtime = modified(path).await?;
        if let Some(hit) = self.lookup(path, mtime) {
            debug!(path = %path.display(), "cache hit");
            return Ok(hit);
        }

        debug!(path = %path.display(), "cache miss, loading");
        let value = Arc::new(load(mtime).await?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                path.to_path_buf(),
                Slot {
                    mtime,
                    value: value.clone(),
                },
            );
        Ok(value)
    }

    fn lookup(&self, path: &Path, mtime: SystemTime) -> Option<Arc<T>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots
            .get(path)
            .filter(|slot| slot.mtime == mtime)
            .map(|slot| slot.value.clone())
    }

    /// Drop slots for files that no longer exist in the scanned set.
    pub fn retain(&self, keep: impl Fn(&Path) -> bool) {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|path, _| keep(path));
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times a file was actually read and parsed.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

pub struct ScanCache<T> {
    slot: RwLock<Option<Arc<T>>>,
    loads: AtomicUsize,
}

impl<T> Default for ScanCache<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(None),
            loads: AtomicUsize::new(0),
        }
    }
}

impl<T> ScanCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load<F, Fut>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cached = self.slot.read().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(hit) = cached {
            return Ok(hit);
        }
        let value = Arc::new(load().await?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(value.clone());
        Ok(value)
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

async fn modified(path: &Path) -> Result<SystemTime> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| HistoryError::io(path, e))?;
    meta.modified().map_err(|e| HistoryError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    async fn read(path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HistoryError::io(path, e))
    }

    #[tokio::test]
    async fn file_cache_reloads_only_on_mtime_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one").unwrap();

        let cache: FileCache<String> = FileCache::new();
        let first = cache.get_or_load(&path, |_| read(&path)).await.unwrap();
        let second = cache.get_or_load(&path, |_| read(&path)).await.unwrap();
        assert_eq!(*first, "one");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 1);

        std::fs::write(&path, "two").unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
        drop(file);

        let third = cache.get_or_load(&path, |_| read(&path)).await.unwrap();
        assert_eq!(*third, "two");
        assert_eq!(cache.load_count(), 2);
    }

    #[tokio::test]
    async fn loader_receives_the_keyed_mtime() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one").unwrap();
        let on_disk = std::fs::metadata(&path).unwrap().modified().unwrap();

        let cache: FileCache<SystemTime> = FileCache::new();
        let seen = cache
            .get_or_load(&path, |mtime| async move { Ok(mtime) })
            .await
            .unwrap();
        assert_eq!(*seen, on_disk);
    }

    #[tokio::test]
    async fn file_cache_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing");
        let cache: FileCache<String> = FileCache::new();
        let err = cache.get_or_load(&path, |_| read(&path)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(cache.load_count(), 0);
    }

    #[tokio::test]
    async fn scan_cache_holds_until_invalidated() {
        let cache: ScanCache<u32> = ScanCache::new();
        let a = cache.get_or_load(|| async { Ok(1) }).await.unwrap();
        let b = cache.get_or_load(|| async { Ok(2) }).await.unwrap();
        assert_eq!((*a, *b), (1, 1));

        cache.invalidate();
        let c = cache.get_or_load(|| async { Ok(3) }).await.unwrap();
        assert_eq!(*c, 3);
        assert_eq!(cache.load_count(), 2);
    }
}
