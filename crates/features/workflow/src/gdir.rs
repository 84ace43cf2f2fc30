//! Per-glacier working directories.
//!
//! A [`GlacierDirectory`] owns `<base>/<RGI60-11>/<RGI60-11.00>/<RGI60-11.00897>`
//! and everything the engine writes for that glacier: registered files
//! (see [`BASENAMES`]), runtime diagnostics and the task log.

use crate::error::{WorkflowError, WorkflowErrorExt};
use crate::fs::{mkdir, purge_tmp, write_atomic};
use chrono::Local;
use moraine_domain::constants::{PER_GLACIER_DIR, TASK_LOG_FILE};
use moraine_domain::{RgiId, TaskStatus};
use moraine_kernel::ParamRegistry;
use moraine_kernel::params::{PathSettings, keys};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

/// Timestamp layout of task log lines.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const STALE_TMP_AGE: Duration = Duration::from_secs(300);

/// Files a glacier directory may hold: `(basename, file name, description)`.
pub const BASENAMES: &[(&str, &str, &str)] = &[
    ("outlines", "outlines.shp", "The glacier outlines in the local map projection"),
    ("intersects", "intersects.shp", "The glacier intersects in the local map projection"),
    ("glacier_grid", "glacier_grid.json", "The glacier's local map projection and grid"),
    ("dem", "dem.tif", "The glacier's local topography, at the grid resolution"),
    ("dem_source", "dem_source.txt", "Name and citation of the topography source"),
    ("gridded_data", "gridded_data.nc", "Gridded fields on the glacier's local grid"),
    ("centerlines", "centerlines.pkl", "The glacier centerlines, ordered by flow"),
    ("downstream_line", "downstream_line.pkl", "The flowline downstream of the glacier terminus"),
    ("catchment_indices", "catchment_indices.pkl", "Grid indices of each flowline catchment"),
    ("flowline_catchments", "flowline_catchments.shp", "The flowline catchments"),
    ("catchments_intersects", "catchments_intersects.shp", "Intersects between catchments"),
    ("inversion_flowlines", "inversion_flowlines.pkl", "Flowlines used by the thickness inversion"),
    ("climate_monthly", "climate_monthly.nc", "Monthly climate series at the glacier"),
    ("climate_info", "climate_info.pkl", "Metadata of the climate series"),
    ("local_mustar", "local_mustar.csv", "Calibrated temperature sensitivity and t star"),
    ("inversion_input", "inversion_input.pkl", "Input fields of the thickness inversion"),
    ("inversion_output", "inversion_output.pkl", "Results of the thickness inversion"),
    ("inversion_params", "inversion_params.pkl", "Creep and sliding parameters of the inversion"),
    ("model_flowlines", "model_flowlines.pkl", "Flowlines ready for the dynamical model"),
    ("gcm_data", "gcm_data.nc", "Climate model data downscaled to the glacier"),
    ("model_run", "model_run.nc", "Output of a dynamical model run"),
    ("model_diagnostics", "model_diagnostics.nc", "Time series diagnostics of a model run"),
    ("diagnostics", "diagnostics.json", "Runtime diagnostics written by the tasks"),
];

/// File name registered for `basename`.
#[must_use]
pub fn basename_file(basename: &str) -> Option<&'static str> {
    BASENAMES.iter().find(|(name, ..)| *name == basename).map(|(_, file, _)| *file)
}

/// Description registered for `basename`.
#[must_use]
pub fn basename_doc(basename: &str) -> Option<&'static str> {
    BASENAMES.iter().find(|(name, ..)| *name == basename).map(|(.., doc)| *doc)
}

/// Ids of the glacier directories found under `base_dir`, sorted.
///
/// Only `<base>/<coarse>/<fine>/<id>` folders whose name is a valid RGI id
/// count; a missing `base_dir` holds no glaciers.
pub fn discover_glacier_ids(base_dir: &Path) -> Result<Vec<RgiId>, WorkflowError> {
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::new();
    for entry in WalkDir::new(base_dir).min_depth(3).max_depth(3) {
        let entry = entry.context(base_dir.display().to_string())?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(id) = entry.file_name().to_str().and_then(|name| RgiId::parse(name).ok()) {
            ids.push(id);
        }
    }
    ids.sort();
    Ok(ids)
}

/// One parsed line of a task log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLogLine {
    pub time: String,
    pub task: String,
    pub status: TaskStatus,
}

impl TaskLogLine {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, ';');
        let time = fields.next()?.trim();
        let task = fields.next()?.trim();
        let status = fields.next()?;
        Some(Self {
            time: time.to_owned(),
            task: task.to_owned(),
            status: TaskStatus::parse(status),
        })
    }
}

#[derive(Debug)]
struct GdirInner {
    rgi_id: RgiId,
    base_dir: PathBuf,
    dir: PathBuf,
    working_dir: Option<PathBuf>,
    use_compression: bool,
    write_lock: Mutex<()>,
}

/// Handle to a glacier directory. Clones share the same directory and lock.
#[derive(Debug, Clone)]
pub struct GlacierDirectory {
    inner: Arc<GdirInner>,
}

impl GlacierDirectory {
    /// Opens (and creates) the directory of `rgi_id` under `base_dir`.
    /// With `reset` any previous content is deleted first.
    pub fn open(
        rgi_id: &str,
        base_dir: impl AsRef<Path>,
        reset: bool,
    ) -> Result<Self, WorkflowError> {
        let rgi_id = RgiId::parse(rgi_id)?;
        Self::create(rgi_id, base_dir.as_ref().to_path_buf(), None, true, reset)
    }

    /// Opens the directory under `<working_dir>/per_glacier`, taking the
    /// compression switch from `params`.
    pub fn from_params(
        rgi_id: &str,
        params: &ParamRegistry,
        reset: bool,
    ) -> Result<Self, WorkflowError> {
        let rgi_id = RgiId::parse(rgi_id)?;
        let paths = PathSettings::from_params(params)?;
        let working_dir = paths.require_working_dir().context("glacier directories")?.clone();
        let use_compression = params.get_bool(keys::USE_COMPRESSION)?;

        Self::create(
            rgi_id,
            working_dir.join(PER_GLACIER_DIR),
            Some(working_dir),
            use_compression,
            reset,
        )
    }

    fn create(
        rgi_id: RgiId,
        base_dir: PathBuf,
        working_dir: Option<PathBuf>,
        use_compression: bool,
        reset: bool,
    ) -> Result<Self, WorkflowError> {
        let (coarse, fine) = rgi_id.shards();
        let dir = base_dir.join(coarse).join(fine).join(rgi_id.as_str());

        mkdir(&dir, reset)?;
        let purged = purge_tmp(&dir, STALE_TMP_AGE);
        if purged > 0 {
            debug!(purged, "Removed stale temporary files in {}", dir.display());
        }

        Ok(Self {
            inner: Arc::new(GdirInner {
                rgi_id,
                base_dir,
                dir,
                working_dir,
                use_compression,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// The same glacier under another base directory, keeping the
    /// working directory and compression switch.
    pub(crate) fn relocated(&self, base_dir: &Path) -> Result<Self, WorkflowError> {
        Self::create(
            self.inner.rgi_id.clone(),
            base_dir.to_path_buf(),
            self.inner.working_dir.clone(),
            self.inner.use_compression,
            false,
        )
    }

    #[must_use]
    pub fn rgi_id(&self) -> &RgiId {
        &self.inner.rgi_id
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.inner.base_dir
    }

    /// Working directory this glacier belongs to, when opened from params.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.inner.working_dir.as_deref()
    }

    #[must_use]
    pub fn use_compression(&self) -> bool {
        self.inner.use_compression
    }

    /// Absolute path of a registered file. `filesuffix` goes in front of the
    /// extension (`model_run` + `_spinup` = `model_run_spinup.nc`); `delete`
    /// removes an existing file first.
    pub fn get_filepath(
        &self,
        basename: &str,
        filesuffix: &str,
        delete: bool,
    ) -> Result<PathBuf, WorkflowError> {
        let file = basename_file(basename)
            .ok_or_else(|| WorkflowError::UnknownBasename { basename: basename.to_owned() })?;

        let file = match (filesuffix, file.rsplit_once('.')) {
            ("", _) => file.to_owned(),
            (suffix, Some((stem, ext))) => format!("{stem}{suffix}.{ext}"),
            (suffix, None) => format!("{file}{suffix}"),
        };

        let path = self.inner.dir.join(file);
        if delete && path.is_file() {
            fs::remove_file(&path).context(format!("Failed to delete {}", path.display()))?;
        }
        Ok(path)
    }

    pub fn has_file(&self, basename: &str) -> Result<bool, WorkflowError> {
        Ok(self.get_filepath(basename, "", false)?.exists())
    }

    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        basename: &str,
        value: &T,
        filesuffix: &str,
    ) -> Result<(), WorkflowError> {
        let path = self.get_filepath(basename, filesuffix, false)?;
        let data = serde_json::to_vec_pretty(value).context(basename.to_owned())?;
        write_atomic(&path, &data)
    }

    pub fn read_json<T: DeserializeOwned>(
        &self,
        basename: &str,
        filesuffix: &str,
    ) -> Result<T, WorkflowError> {
        let path = self.get_filepath(basename, filesuffix, false)?;
        let data = fs::read(&path).context(format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&data).context(path.display().to_string())
    }

    /// Stores a serializable object, LZ4-compressed when `use_compression` is on.
    pub fn write_blob<T: Serialize + ?Sized>(
        &self,
        basename: &str,
        value: &T,
        filesuffix: &str,
    ) -> Result<(), WorkflowError> {
        let path = self.get_filepath(basename, filesuffix, false)?;
        let data = serde_json::to_vec(value).context(basename.to_owned())?;
        let data =
            if self.use_compression() { lz4_flex::compress_prepend_size(&data) } else { data };
        write_atomic(&path, &data)
    }

    pub fn read_blob<T: DeserializeOwned>(
        &self,
        basename: &str,
        filesuffix: &str,
    ) -> Result<T, WorkflowError> {
        let path = self.get_filepath(basename, filesuffix, false)?;
        let data = fs::read(&path).context(format!("Failed to read {}", path.display()))?;
        let data = if self.use_compression() {
            lz4_flex::decompress_size_prepended(&data).context(path.display().to_string())?
        } else {
            data
        };
        serde_json::from_slice(&data).context(path.display().to_string())
    }

    /// Runtime diagnostics, empty when nothing was recorded yet.
    pub fn get_diagnostics(&self) -> Result<Map<String, Value>, WorkflowError> {
        if !self.has_file("diagnostics")? {
            return Ok(Map::new());
        }
        self.read_json("diagnostics", "")
    }

    pub fn add_to_diagnostics(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), WorkflowError> {
        let _guard = self.inner.write_lock.lock();
        let mut diagnostics = self.get_diagnostics()?;
        diagnostics.insert(key.into(), value.into());
        self.write_json("diagnostics", &diagnostics, "")
    }

    /// Appends the outcome of `task` to the task log.
    pub fn log(&self, task: &str, err: Option<&WorkflowError>) -> Result<(), WorkflowError> {
        let status = match err {
            None => TaskStatus::Success,
            Some(err) => TaskStatus::Failed {
                kind: err.kind().to_owned(),
                message: single_line(&err.to_string()),
            },
        };
        let task = log_name(task);
        let line = format!("{};{};{}\n", Local::now().format(LOG_TIME_FORMAT), task, status);

        let path = self.task_log_path();
        let _guard = self.inner.write_lock.lock();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .context(format!("Failed to append to {}", path.display()))
    }

    /// All task log lines, oldest first.
    pub fn task_log(&self) -> Result<Vec<TaskLogLine>, WorkflowError> {
        let path = self.task_log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text =
            fs::read_to_string(&path).context(format!("Failed to read {}", path.display()))?;
        Ok(text.lines().filter_map(TaskLogLine::parse).collect())
    }

    /// Status of the last run of `task`, `None` if it never ran here.
    pub fn get_task_status(&self, task: &str) -> Result<Option<TaskStatus>, WorkflowError> {
        let task = log_name(task);
        Ok(self.task_log()?.into_iter().rev().find(|line| line.task == task).map(|l| l.status))
    }

    fn task_log_path(&self) -> PathBuf {
        self.inner.dir.join(TASK_LOG_FILE)
    }
}

#[derive(serde::Deserialize)]
struct GridSummary {
    nx: u64,
    ny: u64,
    dx: f64,
    dy: f64,
}

impl fmt::Display for GlacierDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.rgi_id();
        writeln!(f, "<moraine.GlacierDirectory>")?;
        writeln!(f, "  RGI id: {id}")?;
        writeln!(f, "  RGI version: {}", id.version())?;
        writeln!(f, "  Region: {}", id.region())?;
        writeln!(f, "  Directory: {}", self.dir().display())?;
        if let Ok(grid) = self.read_json::<GridSummary>("glacier_grid", "") {
            writeln!(f, "  Grid (nx, ny): ({}, {})", grid.nx, grid.ny)?;
            writeln!(f, "  Grid (dx, dy): ({}, {})", grid.dx, grid.dy)?;
        }
        Ok(())
    }
}

fn single_line(message: &str) -> String {
    message.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Task name as it is written to the log: one line, no field separator.
fn log_name(task: &str) -> String {
    single_line(task).replace(';', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const ID: &str = "RGI60-11.00897";

    fn gdir(tmp: &tempfile::TempDir) -> GlacierDirectory {
        GlacierDirectory::open(ID, tmp.path(), false).unwrap()
    }

    #[test]
    fn directory_is_sharded_by_id() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        assert_eq!(gdir.dir(), tmp.path().join("RGI60-11/RGI60-11.00/RGI60-11.00897"));
        assert!(gdir.dir().is_dir());
    }

    #[test]
    fn discovers_existing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_glacier_ids(&tmp.path().join("missing")).unwrap().is_empty());

        for id in ["RGI60-11.00897", "RGI60-11.00001"] {
            GlacierDirectory::open(id, tmp.path(), false).unwrap();
        }
        fs::create_dir_all(tmp.path().join("RGI60-11/RGI60-11.00/not-a-glacier")).unwrap();

        let ids = discover_glacier_ids(tmp.path()).unwrap();
        let ids: Vec<&str> = ids.iter().map(RgiId::as_str).collect();
        assert_eq!(ids, ["RGI60-11.00001", "RGI60-11.00897"]);
    }

    #[test]
    fn rejects_malformed_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let err = GlacierDirectory::open("RGI60-11", tmp.path(), false).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidId { .. }));
    }

    #[test]
    fn reset_wipes_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let first = gdir(&tmp);
        fs::write(first.dir().join("stray.txt"), "x").unwrap();

        let kept = GlacierDirectory::open(ID, tmp.path(), false).unwrap();
        assert!(kept.dir().join("stray.txt").exists());

        let reset = GlacierDirectory::open(ID, tmp.path(), true).unwrap();
        assert!(!reset.dir().join("stray.txt").exists());
    }

    #[test]
    fn filepath_inserts_suffix_before_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);

        let plain = gdir.get_filepath("model_run", "", false).unwrap();
        let spun = gdir.get_filepath("model_run", "_spinup", false).unwrap();
        assert_eq!(plain.file_name().unwrap(), "model_run.nc");
        assert_eq!(spun.file_name().unwrap(), "model_run_spinup.nc");

        let err = gdir.get_filepath("no_such_file", "", false).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownBasename { .. }));
    }

    #[test]
    fn filepath_delete_removes_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        let path = gdir.get_filepath("dem_source", "", false).unwrap();
        fs::write(&path, "SRTM").unwrap();
        assert!(gdir.has_file("dem_source").unwrap());

        gdir.get_filepath("dem_source", "", true).unwrap();
        assert!(!gdir.has_file("dem_source").unwrap());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Params {
        glen_a: f64,
        fs: f64,
    }

    #[test]
    fn blobs_are_compressed_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        let value = Params { glen_a: 2.4e-24, fs: 0.0 };

        gdir.write_blob("inversion_params", &value, "").unwrap();
        let raw = fs::read(gdir.get_filepath("inversion_params", "", false).unwrap()).unwrap();
        assert!(serde_json::from_slice::<Params>(&raw).is_err());

        let back: Params = gdir.read_blob("inversion_params", "").unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn diagnostics_accumulate() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        assert!(gdir.get_diagnostics().unwrap().is_empty());

        gdir.add_to_diagnostics("dem_source", "SRTM").unwrap();
        gdir.add_to_diagnostics("n_centerlines", 3).unwrap();

        let diagnostics = gdir.get_diagnostics().unwrap();
        assert_eq!(diagnostics["dem_source"], "SRTM");
        assert_eq!(diagnostics["n_centerlines"], 3);
    }

    #[test]
    fn task_status_follows_the_last_matching_line() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        assert_eq!(gdir.get_task_status("glacier_masks").unwrap(), None);

        let err = WorkflowError::task("InvalidGeometry", "glacier\ntoo small");
        gdir.log("glacier_masks", Some(&err)).unwrap();
        gdir.log("glacier_masks_spinup", None).unwrap();

        assert_eq!(
            gdir.get_task_status("glacier_masks").unwrap(),
            Some(TaskStatus::Failed {
                kind: "InvalidGeometry".into(),
                message: "glacier too small".into()
            })
        );

        gdir.log("glacier_masks", None).unwrap();
        assert_eq!(gdir.get_task_status("glacier_masks").unwrap(), Some(TaskStatus::Success));

        let lines = gdir.task_log().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].time.len(), "2024-01-01T00:00:00".len());
    }

    #[test]
    fn task_names_cannot_break_the_log_format() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);

        gdir.log("masks;v2\nSUCCESS", None).unwrap();
        gdir.log("centerlines", None).unwrap();

        let lines = gdir.task_log().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].task, "masks_v2 SUCCESS");
        assert_eq!(lines[1].task, "centerlines");
        assert_eq!(
            gdir.get_task_status("masks;v2\nSUCCESS").unwrap(),
            Some(TaskStatus::Success)
        );
        assert_eq!(gdir.get_task_status("masks").unwrap(), None);
    }

    #[test]
    fn display_lists_the_grid_when_present() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = gdir(&tmp);
        assert!(!gdir.to_string().contains("Grid"));

        let grid = serde_json::json!({ "nx": 120, "ny": 90, "dx": 50.0, "dy": -50.0 });
        gdir.write_json("glacier_grid", &grid, "").unwrap();

        let summary = gdir.to_string();
        assert!(summary.contains("  RGI id: RGI60-11.00897"));
        assert!(summary.contains("  Grid (nx, ny): (120, 90)"));
        assert!(summary.contains("  Grid (dx, dy): (50, -50)"));
    }
}
