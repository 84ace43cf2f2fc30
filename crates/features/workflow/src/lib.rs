//! # Workflow
//!
//! Plumbing shared by every processing step of the glacier model:
//!
//! * [`GlacierDirectory`]: the per-glacier folder, its registered files,
//!   diagnostics and task log.
//! * [`run_entity_task`] and [`Executor`]: run a task on one or many glaciers,
//!   skipping work that already succeeded and recording failures.
//! * [`compile_task_log`], [`LruFileCache`], [`copy_to_basedir`] and the
//!   filesystem helpers in [`fs`].
//!
//! ## Example
//!
//! ```rust
//! use moraine_kernel::params::FailurePolicy;
//! use moraine_workflow::{Executor, GlacierDirectory, TaskOptions, entity_task};
//!
//! let tmp = tempfile::tempdir().unwrap();
//! let gdir = GlacierDirectory::open("RGI60-11.00897", tmp.path(), false).unwrap();
//!
//! let policy = FailurePolicy { continue_on_error: false, auto_skip_task: true };
//! let executor = Executor::sequential(TaskOptions::new(policy));
//! let task = entity_task("write_dem_source", |gdir: &GlacierDirectory| {
//!     gdir.add_to_diagnostics("dem_source", "SRTM")
//! });
//!
//! let results = executor.execute_entity_task(&task, &[gdir.clone()]);
//! assert!(results[0].as_ref().unwrap().is_completed());
//! assert!(gdir.get_task_status("write_dem_source").unwrap().unwrap().is_success());
//! ```

mod cache;
mod copy;
mod error;
mod executor;
pub mod fs;
mod gdir;
mod task;
mod task_log;

pub use cache::{DEFAULT_MAXSIZE, LruFileCache};
pub use copy::{CopySetup, copy_to_basedir};
pub use error::{WorkflowError, WorkflowErrorExt};
pub use executor::{EntityResult, Executor, WORKER_THREAD_NAME};
pub use fs::{empty_cache, expand_path, gettempdir, mkdir};
pub use gdir::{
    BASENAMES, GlacierDirectory, LOG_TIME_FORMAT, TaskLogLine, basename_doc, basename_file,
    discover_glacier_ids,
};
pub use task::{
    EntityTask, FnTask, TaskOptions, TaskOutcome, entity_task, pipe_log, run_entity_task,
    run_global_task,
};
pub use task_log::{CLASH_SUFFIX, INDEX_COLUMN, TaskLogRow, TaskLogTable, compile_task_log};
