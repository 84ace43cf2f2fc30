use anyhow::Result;
use moraine::initialize;
use std::path::Path;

pub fn init(params_file: Option<&Path>, ids: &[String], reset: bool) -> Result<()> {
    let workspace = initialize(params_file)?;
    for gdir in workspace.init_glacier_directories(ids, reset)? {
        println!("{}", gdir.dir().display());
    }
    Ok(())
}
