//! Literal forms and file names shared across crates.

/// Boolean literal accepted for `true`.
pub const TRUE_LITERAL: &str = "True";
/// Boolean literal accepted for `false`.
pub const FALSE_LITERAL: &str = "False";

/// Status written to a task log for a task that completed.
pub const SUCCESS: &str = "SUCCESS";

/// Sub-directory of the working directory holding glacier directories.
pub const PER_GLACIER_DIR: &str = "per_glacier";
/// Sub-directory of the working directory holding per-glacier error logs.
pub const ERROR_LOG_DIR: &str = "log";
/// Name of the task log inside a glacier directory.
pub const TASK_LOG_FILE: &str = "log.txt";

/// Prefix for environment overrides, e.g. `MORAINE__BORDER=80`.
pub const ENV_PREFIX: &str = "MORAINE";
/// Environment switch forcing multiprocessing on (`1`) or off (`0`).
pub const ENV_USE_MULTIPROCESSING: &str = "MORAINE_USE_MULTIPROCESSING";
