use anyhow::{Context, Result, anyhow};
use moraine::kernel::config::load_params;
use moraine::kernel::params::DEFAULT_PARAMS;
use moraine::kernel::{ParamsBuilder, Settings};
use std::path::Path;

pub fn print_defaults() {
    print!("{DEFAULT_PARAMS}");
}

/// Parses `file` on top of the defaults and validates the resulting settings.
pub fn check(file: &Path, strict: bool) -> Result<()> {
    let params = ParamsBuilder::new()
        .strict(strict)
        .file(file)
        .build()
        .with_context(|| format!("{} is not a valid params file", file.display()))?;

    Settings::from_params(&params)
        .and_then(|settings| settings.validate())
        .with_context(|| format!("{} has inconsistent settings", file.display()))?;

    for key in params.undeclared() {
        println!("note: '{key}' is not a known parameter");
    }
    println!("{}: {} parameters OK", file.display(), params.len());
    Ok(())
}

pub fn get(params_file: Option<&Path>, key: &str) -> Result<()> {
    let params = load_params(params_file)?;
    let entry = params.entry(key).ok_or_else(|| anyhow!("Unknown parameter '{key}'"))?;
    println!("{}", entry.literal()?);
    Ok(())
}

pub fn dump(params_file: Option<&Path>, json: bool) -> Result<()> {
    let params = load_params(params_file)?;
    if json {
        println!("{}", params.to_json().context("Failed to render parameters as JSON")?);
    } else {
        print!("{}", params.to_cfg_string()?);
    }
    Ok(())
}

/// Lists keys whose value would change if `file` were used instead.
pub fn diff(params_file: Option<&Path>, file: &Path) -> Result<()> {
    let current = load_params(params_file)?;
    let other = load_params(Some(file))
        .with_context(|| format!("{} is not a valid params file", file.display()))?;

    let changes = current.diff(&other);
    if changes.is_empty() {
        println!("No differences");
    }
    for change in changes {
        println!("{change}");
    }
    Ok(())
}
