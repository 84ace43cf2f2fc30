use crate::error::ParamsError;
use crate::params::{ParamRegistry, ParamsBuilder};
use moraine_domain::constants::ENV_PREFIX;
use std::path::Path;
use tracing::info;

/// Loads the parameters a process runs with.
///
/// Layers, lowest first:
/// 1. **Bundled defaults** (`params.cfg` shipped with this crate).
/// 2. **User file**, when `path` is given. Its keys override the defaults.
/// 3. **Environment overrides**: `MORAINE__<KEY>` (e.g. `MORAINE__BORDER=80`)
///    and the `MORAINE_USE_MULTIPROCESSING=0|1` switch.
///
/// # Errors
/// * The file cannot be read or contains a malformed line.
/// * A value does not match the declared kind of its key.
///
/// # Example
/// ```rust
/// use moraine_kernel::config::load_params;
///
/// let params = load_params(None::<&str>).unwrap();
/// assert_eq!(params.get_str("rgi_version").unwrap(), "61");
/// ```
pub fn load_params(path: Option<impl AsRef<Path>>) -> Result<ParamRegistry, ParamsError> {
    let mut builder = ParamsBuilder::new();

    match path {
        Some(path) => {
            info!("Reading parameters from {}", path.as_ref().display());
            builder = builder.file(path);
        },
        None => info!("Reading parameters from the bundled defaults"),
    }

    builder.env(ENV_PREFIX).build()
}
