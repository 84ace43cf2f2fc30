//! Filesystem helpers shared by glacier directories and the utilities.

use crate::error::{WorkflowError, WorkflowErrorExt};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

pub use moraine_kernel::paths::expand_path;

/// Name of the directory created under the temporary base by [`gettempdir`].
pub const TEMP_DIR_NAME: &str = "moraine";

const TMP_MARKER: &str = ".moraine-tmp.";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates `path` and its parents. With `reset` an existing directory is
/// removed first. Returns the path for chaining.
pub fn mkdir(path: impl AsRef<Path>, reset: bool) -> Result<PathBuf, WorkflowError> {
    let path = path.as_ref();
    if reset && path.exists() {
        fs::remove_dir_all(path).context(format!("Failed to reset {}", path.display()))?;
    }
    fs::create_dir_all(path).context(format!("Failed to create {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// A scratch directory `<tmp>/moraine/<name>`, or `~/tmp/moraine/<name>`
/// when `home` is set.
pub fn gettempdir(name: &str, reset: bool, home: bool) -> Result<PathBuf, WorkflowError> {
    let base = if home {
        moraine_kernel::paths::home_dir()
            .ok_or("Cannot locate the home directory")?
            .join("tmp")
    } else {
        std::env::temp_dir()
    };
    mkdir(base.join(TEMP_DIR_NAME).join(name), reset)
}

/// Removes everything under `cache_dir` and recreates it empty.
pub fn empty_cache(cache_dir: impl AsRef<Path>) -> Result<(), WorkflowError> {
    let cache_dir = mkdir(cache_dir, true)?;
    info!("Emptied cache directory {}", cache_dir.display());
    Ok(())
}

/// Writes `data` to `target` through a temporary sibling and a rename, so
/// readers never observe a partially written file.
pub(crate) fn write_atomic(target: &Path, data: &[u8]) -> Result<(), WorkflowError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
    }

    let temp = unique_tmp_path(target);
    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .context(format!("Temp creation failed: {}", temp.display()))?;
        file.write_all(data).context("Write failed")?;
        file.sync_all().context("Hardware sync failed")?;
    }

    if let Err(source) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(WorkflowError::Io {
            source,
            context: Some(
                format!("Atomic swap failed: {} -> {}", temp.display(), target.display()).into(),
            ),
        });
    }
    Ok(())
}

fn unique_tmp_path(target: &Path) -> PathBuf {
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{counter}", std::process::id()))
}

/// Deletes temporary files older than `threshold` left behind by interrupted
/// writes. Returns how many were removed.
pub(crate) fn purge_tmp(root: &Path, threshold: Duration) -> usize {
    let now = SystemTime::now();
    let mut removed = 0;

    WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|entry| is_tmp(entry) && is_stale(entry, now, threshold))
        .for_each(|entry| match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!(p = %entry.path().display(), err = %e, "IO fail"),
        });

    removed
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age >= threshold)
}
