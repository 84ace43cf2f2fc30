use crate::error::{WorkflowError, WorkflowErrorExt};
use crate::gdir::GlacierDirectory;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use strum_macros::{Display, EnumString, IntoStaticStr};
use tracing::info;
use walkdir::WalkDir;

/// Files needed for a dynamical run.
const RUN_FILES: &[&str] = &[
    "model_flowlines",
    "inversion_params",
    "outlines",
    "local_mustar",
    "climate_monthly",
    "gridded_data",
    "gcm_data",
    "climate_info",
];

/// Files needed to redo the inversion and then run.
const INVERSION_FILES: &[&str] = &[
    "inversion_params",
    "downstream_line",
    "outlines",
    "inversion_flowlines",
    "glacier_grid",
    "local_mustar",
    "climate_monthly",
    "gridded_data",
    "gcm_data",
    "climate_info",
];

/// Directory name fragments whose files are never copied selectively.
const SKIPPED_DIRS: &[&str] = &["divide", "log"];

/// Which files [`copy_to_basedir`] takes along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CopySetup {
    #[default]
    Run,
    Inversion,
    All,
}

impl CopySetup {
    /// Basenames copied by this setup; `None` copies everything.
    #[must_use]
    pub const fn basenames(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Run => Some(RUN_FILES),
            Self::Inversion => Some(INVERSION_FILES),
            Self::All => None,
        }
    }

    fn matcher(self) -> Result<Option<GlobSet>, WorkflowError> {
        let Some(basenames) = self.basenames() else {
            return Ok(None);
        };
        let mut builder = GlobSetBuilder::new();
        for basename in basenames {
            builder.add(Glob::new(&format!("*{basename}*"))?);
        }
        Ok(Some(builder.build()?))
    }
}

/// Copies the directory of `gdir` under `base_dir` and returns the copy.
///
/// Sub-directories are recreated; with a selective setup only files whose
/// name contains one of its basenames are copied, and directories named
/// like `divide*` or `log*` contribute nothing.
pub fn copy_to_basedir(
    gdir: &GlacierDirectory,
    base_dir: impl AsRef<Path>,
    setup: CopySetup,
) -> Result<GlacierDirectory, WorkflowError> {
    let target = gdir.relocated(base_dir.as_ref())?;
    if target.dir() == gdir.dir() {
        return Ok(target);
    }

    let matcher = setup.matcher()?;
    let mut copied = 0_usize;

    for entry in WalkDir::new(gdir.dir()).min_depth(1) {
        let entry = entry.context(gdir.rgi_id().to_string())?;
        let relative = entry
            .path()
            .strip_prefix(gdir.dir())
            .map_err(|e| WorkflowError::from(format!("{}: {e}", entry.path().display())))?;
        let dest = target.dir().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).context(format!("Failed to create {}", dest.display()))?;
            continue;
        }

        if let Some(matcher) = &matcher
            && !(in_copied_dir(entry.path()) && matcher.is_match(entry.file_name()))
        {
            continue;
        }

        fs::copy(entry.path(), &dest).context(format!("Failed to copy to {}", dest.display()))?;
        copied += 1;
    }

    info!("({}) copied {} files to {} ({})", gdir.rgi_id(), copied, target.dir().display(), setup);
    Ok(target)
}

fn in_copied_dir(file: &Path) -> bool {
    let parent = file.parent().and_then(Path::file_name).and_then(|n| n.to_str()).unwrap_or("");
    !SKIPPED_DIRS.iter().any(|skipped| parent.contains(skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn populated(tmp: &Path) -> GlacierDirectory {
        let gdir = GlacierDirectory::open("RGI60-11.00897", tmp.join("src"), false).unwrap();
        for file in ["model_flowlines.pkl", "dem.tif", "glacier_grid.json", "outlines.shp"] {
            fs::write(gdir.dir().join(file), file).unwrap();
        }
        fs::create_dir_all(gdir.dir().join("divide_01")).unwrap();
        fs::write(gdir.dir().join("divide_01/outlines.shp"), "x").unwrap();
        gdir
    }

    #[test]
    fn run_setup_copies_only_run_files() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = populated(tmp.path());

        let copy = copy_to_basedir(&gdir, tmp.path().join("dst"), CopySetup::Run).unwrap();
        assert!(copy.dir().starts_with(tmp.path().join("dst")));
        assert!(copy.dir().join("model_flowlines.pkl").exists());
        assert!(copy.dir().join("outlines.shp").exists());
        assert!(!copy.dir().join("dem.tif").exists());
        assert!(!copy.dir().join("glacier_grid.json").exists());
        assert!(copy.dir().join("divide_01").is_dir());
        assert!(!copy.dir().join("divide_01/outlines.shp").exists());
    }

    #[test]
    fn inversion_setup_adds_the_grid() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = populated(tmp.path());

        let copy = copy_to_basedir(&gdir, tmp.path().join("dst"), CopySetup::Inversion).unwrap();
        assert!(copy.dir().join("glacier_grid.json").exists());
        assert!(!copy.dir().join("model_flowlines.pkl").exists());
    }

    #[test]
    fn all_setup_copies_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let gdir = populated(tmp.path());

        let copy = copy_to_basedir(&gdir, tmp.path().join("dst"), CopySetup::All).unwrap();
        assert!(copy.dir().join("dem.tif").exists());
        assert!(copy.dir().join("divide_01/outlines.shp").exists());
    }

    #[test]
    fn setup_names_parse() {
        assert_eq!(CopySetup::from_str("inversion").unwrap(), CopySetup::Inversion);
        assert_eq!(CopySetup::All.to_string(), "all");
        assert!(CopySetup::from_str("everything").is_err());
    }
}
