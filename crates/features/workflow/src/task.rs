//! Entity and global task plumbing: skip-on-success, task logs, error files
//! and the continue-on-error policy.

use crate::error::WorkflowError;
use crate::fs::mkdir;
use crate::gdir::{GlacierDirectory, LOG_TIME_FORMAT};
use chrono::Local;
use moraine_domain::constants::ERROR_LOG_DIR;
use moraine_kernel::ParamRegistry;
use moraine_kernel::params::FailurePolicy;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::{debug, error, info, warn};

/// A unit of work applied independently to each glacier directory.
pub trait EntityTask: Sync {
    type Output: Send;

    /// Name written to the task log.
    fn name(&self) -> &str;

    fn run(&self, gdir: &GlacierDirectory) -> Result<Self::Output, WorkflowError>;
}

/// An [`EntityTask`] backed by a closure.
#[derive(Debug, Clone)]
pub struct FnTask<F> {
    name: String,
    func: F,
}

/// Wraps `func` into a named entity task.
pub fn entity_task<F, T>(name: impl Into<String>, func: F) -> FnTask<F>
where
    F: Fn(&GlacierDirectory) -> Result<T, WorkflowError> + Sync,
    T: Send,
{
    FnTask { name: name.into(), func }
}

impl<F, T> EntityTask for FnTask<F>
where
    F: Fn(&GlacierDirectory) -> Result<T, WorkflowError> + Sync,
    T: Send,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, gdir: &GlacierDirectory) -> Result<T, WorkflowError> {
        (self.func)(gdir)
    }
}

/// How a single task invocation behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub policy: FailurePolicy,
    /// Run even when the last run succeeded. Defaults to `!auto_skip_task`.
    pub reset: Option<bool>,
    /// Appended to the task name in the log, e.g. `_spinup`.
    pub filesuffix: String,
}

impl TaskOptions {
    #[must_use]
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy, reset: None, filesuffix: String::new() }
    }

    pub fn from_params(params: &ParamRegistry) -> Result<Self, WorkflowError> {
        Ok(Self::new(FailurePolicy::from_params(params)?))
    }

    #[must_use]
    pub const fn reset(mut self, reset: bool) -> Self {
        self.reset = Some(reset);
        self
    }

    #[must_use]
    pub fn filesuffix(mut self, filesuffix: impl Into<String>) -> Self {
        self.filesuffix = filesuffix.into();
        self
    }

    /// Name the task is logged under.
    #[must_use]
    pub fn logged_name(&self, task: &str) -> String {
        format!("{task}{}", self.filesuffix)
    }

    fn should_reset(&self) -> bool {
        self.reset.unwrap_or(!self.policy.auto_skip_task)
    }
}

/// Result of running one task on one glacier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    /// The task already succeeded here and was not run again.
    Skipped,
    /// The task failed and `continue_on_error` kept the run going.
    /// Holds `Kind: message`.
    Failed(String),
}

impl<T> TaskOutcome<T> {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    #[must_use]
    pub fn into_output(self) -> Option<T> {
        match self {
            Self::Completed(output) => Some(output),
            Self::Skipped | Self::Failed(_) => None,
        }
    }
}

/// Runs `task` on `gdir`, recording the outcome in its task log.
///
/// A failing task is written to the task log and to
/// `<working_dir>/log/<RGI id>.ERROR`. With `continue_on_error` the failure
/// is returned as [`TaskOutcome::Failed`], otherwise as
/// [`WorkflowError::TaskFailed`].
pub fn run_entity_task<T>(
    gdir: &GlacierDirectory,
    task: &T,
    options: &TaskOptions,
) -> Result<TaskOutcome<T::Output>, WorkflowError>
where
    T: EntityTask + ?Sized,
{
    let name = options.logged_name(task.name());

    if !options.should_reset()
        && gdir.get_task_status(&name)?.is_some_and(|status| status.is_success())
    {
        debug!("({}) {} already done, skipping", gdir.rgi_id(), name);
        return Ok(TaskOutcome::Skipped);
    }

    info!("({}) {}", gdir.rgi_id(), name);

    match task.run(gdir) {
        Ok(output) => {
            gdir.log(&name, None)?;
            Ok(TaskOutcome::Completed(output))
        },
        Err(err) => {
            gdir.log(&name, Some(&err))?;
            pipe_log(gdir, &name, &err);
            error!("{} occurred during task {} on {}: {}", err.kind(), name, gdir.rgi_id(), err);

            if options.policy.continue_on_error {
                Ok(TaskOutcome::Failed(format!("{}: {}", err.kind(), err)))
            } else {
                Err(WorkflowError::TaskFailed {
                    task: name,
                    rgi_id: gdir.rgi_id().to_string(),
                    source: Box::new(err),
                })
            }
        },
    }
}

/// Appends a failure to `<working_dir>/log/<RGI id>.ERROR`.
///
/// Directories opened without a working directory have nowhere to write;
/// the failure is then only reported as a warning.
pub fn pipe_log(gdir: &GlacierDirectory, task: &str, err: &WorkflowError) {
    let Some(working_dir) = gdir.working_dir() else {
        warn!("Cannot log to file without a valid working_dir");
        return;
    };

    let line = format!(
        "{}; {}; {}; {}\n",
        Local::now().format(LOG_TIME_FORMAT),
        task,
        err.kind(),
        err.to_string().replace('\n', " ")
    );

    let written = mkdir(working_dir.join(ERROR_LOG_DIR), false).and_then(|dir| {
        let path = dir.join(format!("{}.ERROR", gdir.rgi_id()));
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(WorkflowError::from)
    });

    if let Err(e) = written {
        warn!(err = %e, "Failed to write the error log of {}", gdir.rgi_id());
    }
}

/// Runs a task that needs every glacier directory at once.
pub fn run_global_task<T, F>(
    name: &str,
    gdirs: &[GlacierDirectory],
    func: F,
) -> Result<T, WorkflowError>
where
    F: FnOnce(&[GlacierDirectory]) -> Result<T, WorkflowError>,
{
    info!("Applying global task {} on {} glaciers", name, gdirs.len());
    func(gdirs).inspect_err(|err| {
        error!("{} occurred during global task {}: {}", err.kind(), name, err);
    })
}
