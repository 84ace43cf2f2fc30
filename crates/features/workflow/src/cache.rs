use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default number of files a [`LruFileCache`] keeps.
pub const DEFAULT_MAXSIZE: usize = 100;

/// Keeps the most recently used files on disk and deletes the rest.
///
/// Appending a path marks it as most recent; once more than `maxsize` paths
/// are tracked the oldest one is removed from the cache and from disk.
#[derive(Debug)]
pub struct LruFileCache {
    maxsize: usize,
    files: Mutex<VecDeque<PathBuf>>,
}

impl Default for LruFileCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAXSIZE)
    }
}

impl LruFileCache {
    #[must_use]
    pub fn new(maxsize: usize) -> Self {
        Self { maxsize, files: Mutex::new(VecDeque::new()) }
    }

    /// A cache seeded with `files`, oldest first. Excess files are purged.
    #[must_use]
    pub fn with_files(files: impl IntoIterator<Item = PathBuf>, maxsize: usize) -> Self {
        let cache = Self::new(maxsize);
        for file in files {
            cache.append(file);
        }
        cache
    }

    #[must_use]
    pub const fn maxsize(&self) -> usize {
        self.maxsize
    }

    pub fn append(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let evicted = {
            let mut files = self.files.lock();
            files.retain(|f| f != &path);
            files.push_back(path);

            let excess = files.len().saturating_sub(self.maxsize);
            files.drain(..excess).collect::<Vec<_>>()
        };

        for file in evicted {
            remove(&file);
        }
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().iter().any(|f| f == path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Tracked files, oldest first.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().iter().cloned().collect()
    }
}

fn remove(file: &Path) {
    match std::fs::remove_file(file) {
        Ok(()) => debug!("Evicted {} from the file cache", file.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {},
        Err(e) => warn!(p = %file.display(), err = %e, "Failed to evict cached file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn evicts_the_oldest_file_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = LruFileCache::new(2);
        let a = touch(tmp.path(), "a.nc");
        let b = touch(tmp.path(), "b.nc");
        let c = touch(tmp.path(), "c.nc");

        cache.append(&a);
        cache.append(&b);
        cache.append(&c);

        assert_eq!(cache.files(), [b.clone(), c.clone()]);
        assert!(!a.exists());
        assert!(b.exists() && c.exists());
    }

    #[test]
    fn appending_again_refreshes_instead_of_duplicating() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = LruFileCache::new(2);
        let a = touch(tmp.path(), "a.nc");
        let b = touch(tmp.path(), "b.nc");
        let c = touch(tmp.path(), "c.nc");

        cache.append(&a);
        cache.append(&b);
        cache.append(&a);
        assert_eq!(cache.len(), 2);

        cache.append(&c);
        assert!(!b.exists());
        assert!(cache.contains(&a));
        assert_eq!(cache.files(), [a, c]);
    }

    #[test]
    fn seeding_purges_excess_and_tolerates_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let kept = touch(tmp.path(), "kept.nc");
        let missing = tmp.path().join("missing.nc");

        let cache = LruFileCache::with_files([missing, kept.clone()], 1);
        assert_eq!(cache.files(), [kept]);
    }
}
