//! Facade crate for moraine.
//! Re-exports the domain, kernel and workflow crates and wires them together.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! Call [`initialize`] once per process to load the parameters, validate them
//! and prepare the working directory, then open glacier directories and run
//! tasks through the returned [`Workspace`].

pub use moraine_domain as domain;
pub use moraine_kernel as kernel;
pub use moraine_workflow as workflow;

use moraine_kernel::config::load_params;
use moraine_kernel::{ParamRegistry, Settings};
use moraine_workflow::{Executor, GlacierDirectory, WorkflowError, mkdir};
use std::path::Path;
use tracing::info;

/// Loads parameters (bundled defaults, optional file, environment), validates
/// them and creates the working directory when one is configured.
pub fn initialize(params_file: Option<impl AsRef<Path>>) -> Result<Workspace, WorkflowError> {
    Workspace::from_params(load_params(params_file)?)
}

/// Validated parameters of a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    params: ParamRegistry,
    settings: Settings,
}

impl Workspace {
    pub fn from_params(params: ParamRegistry) -> Result<Self, WorkflowError> {
        let settings = Settings::from_params(&params)?;
        settings.validate()?;

        match &settings.paths.working_dir {
            Some(dir) => {
                mkdir(dir, false)?;
                info!("Working directory: {}", dir.display());
            },
            None => info!("No working directory set"),
        }

        Ok(Self { params, settings })
    }

    #[must_use]
    pub const fn params(&self) -> &ParamRegistry {
        &self.params
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn working_dir(&self) -> Result<&Path, WorkflowError> {
        Ok(self.settings.paths.require_working_dir()?.as_path())
    }

    /// An executor following the multiprocessing and failure settings.
    pub fn executor(&self) -> Result<Executor, WorkflowError> {
        Executor::from_params(&self.params)
    }

    /// Opens the glacier directories of `rgi_ids` under the working directory.
    pub fn init_glacier_directories<I, S>(
        &self,
        rgi_ids: I,
        reset: bool,
    ) -> Result<Vec<GlacierDirectory>, WorkflowError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let gdirs = rgi_ids
            .into_iter()
            .map(|id| GlacierDirectory::from_params(id.as_ref(), &self.params, reset))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Initialized {} glacier directories", gdirs.len());
        Ok(gdirs)
    }
}
