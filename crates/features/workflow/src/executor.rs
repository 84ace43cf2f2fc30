use crate::error::WorkflowError;
use crate::gdir::GlacierDirectory;
use crate::task::{EntityTask, TaskOptions, TaskOutcome, run_entity_task};
use moraine_kernel::ParamRegistry;
use moraine_kernel::params::Multiprocessing;
use moraine_pool::{PoolConfig, ThreadPool, build_pool};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Thread name prefix of executor workers.
pub const WORKER_THREAD_NAME: &str = "moraine-task";

/// Result of one task on one glacier, in the order the glaciers were given.
pub type EntityResult<T> = Result<TaskOutcome<T>, WorkflowError>;

/// Applies entity tasks to many glacier directories, in parallel when
/// multiprocessing is enabled.
#[derive(Debug, Clone)]
pub struct Executor {
    pool: Option<Arc<ThreadPool>>,
    options: TaskOptions,
}

impl Executor {
    /// Honours `use_multiprocessing`, `mp_processes`, `continue_on_error`
    /// and `auto_skip_task`.
    pub fn from_params(params: &ParamRegistry) -> Result<Self, WorkflowError> {
        let mp = Multiprocessing::from_params(params)?;
        let options = TaskOptions::from_params(params)?;
        if mp.enabled {
            Self::with_workers(mp.effective_workers(), options)
        } else {
            Ok(Self::sequential(options))
        }
    }

    /// Runs every task on the calling thread.
    #[must_use]
    pub const fn sequential(options: TaskOptions) -> Self {
        Self { pool: None, options }
    }

    /// Runs tasks on a dedicated pool of `workers` threads.
    pub fn with_workers(workers: usize, options: TaskOptions) -> Result<Self, WorkflowError> {
        let config =
            PoolConfig::default().with_workers(workers).with_thread_name(WORKER_THREAD_NAME);
        let pool = build_pool(&config)
            .map_err(|e| WorkflowError::Pool { message: format!("{e:#}"), context: None })?;
        info!("Multiprocessing: using {} workers", pool.current_num_threads());
        Ok(Self { pool: Some(Arc::new(pool)), options })
    }

    /// A copy of this executor sharing its pool but running with `options`.
    #[must_use]
    pub fn with_options(&self, options: TaskOptions) -> Self {
        Self { pool: self.pool.clone(), options }
    }

    #[must_use]
    pub const fn options(&self) -> &TaskOptions {
        &self.options
    }

    /// Number of tasks that may run at once.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// Runs `task` on every directory. Results keep the order of `gdirs`.
    pub fn execute_entity_task<T>(
        &self,
        task: &T,
        gdirs: &[GlacierDirectory],
    ) -> Vec<EntityResult<T::Output>>
    where
        T: EntityTask + ?Sized,
    {
        info!("Execute entity task {} on {} glaciers", task.name(), gdirs.len());

        let options = &self.options;
        match &self.pool {
            Some(pool) => pool.install(|| {
                gdirs.par_iter().map(|gdir| run_entity_task(gdir, task, options)).collect()
            }),
            None => gdirs.iter().map(|gdir| run_entity_task(gdir, task, options)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::entity_task;
    use moraine_kernel::params::FailurePolicy;

    const IDS: [&str; 5] =
        ["RGI60-11.00897", "RGI60-11.00001", "RGI60-11.00787", "RGI60-11.01450", "RGI60-11.00002"];

    fn gdirs(tmp: &tempfile::TempDir) -> Vec<GlacierDirectory> {
        IDS.iter().map(|id| GlacierDirectory::open(id, tmp.path(), false).unwrap()).collect()
    }

    fn options() -> TaskOptions {
        TaskOptions::new(FailurePolicy { continue_on_error: true, auto_skip_task: false })
    }

    #[test]
    fn parallel_results_keep_input_order() {
        let tmp = tempfile::tempdir().unwrap();
        let gdirs = gdirs(&tmp);
        let task = entity_task("echo_id", |gdir: &GlacierDirectory| Ok(gdir.rgi_id().to_string()));

        let executor = Executor::with_workers(3, options()).unwrap();
        assert_eq!(executor.workers(), 3);

        let ids: Vec<String> = executor
            .execute_entity_task(&task, &gdirs)
            .into_iter()
            .map(|r| r.unwrap().into_output().unwrap())
            .collect();
        assert_eq!(ids, IDS);
    }

    #[test]
    fn failures_stay_with_their_glacier() {
        let tmp = tempfile::tempdir().unwrap();
        let gdirs = gdirs(&tmp);
        let task = entity_task("picky", |gdir: &GlacierDirectory| {
            if gdir.rgi_id().as_str().ends_with("00001") {
                Err(WorkflowError::task("InvalidGeometry", "bad outline"))
            } else {
                Ok(())
            }
        });

        let results = Executor::sequential(options()).execute_entity_task(&task, &gdirs);
        assert_eq!(results.len(), IDS.len());
        assert!(matches!(results[1], Ok(TaskOutcome::Failed(_))));
        for (i, result) in results.iter().enumerate().filter(|(i, _)| *i != 1) {
            assert!(result.as_ref().unwrap().is_completed(), "glacier {i} did not complete");
        }
    }

    #[test]
    fn sequential_executor_has_one_worker() {
        let executor = Executor::sequential(options());
        assert_eq!(executor.workers(), 1);
        let strict = executor.with_options(options().reset(true));
        assert_eq!(strict.options().reset, Some(true));
    }
}
