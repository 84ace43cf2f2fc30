//! The declared parameters: names, kinds and the bundled defaults.

use super::literal::Normalize;
use moraine_domain::{GridDxMethod, ParamKind, RgiVersion, TopoInterp};
use serde::Serialize;

/// The bundled default params file.
pub const DEFAULT_PARAMS: &str = include_str!("../../params.cfg");

/// Declaration of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    #[serde(skip)]
    pub normalize: Normalize,
    /// A blank value is rejected instead of resolving to unset.
    pub required: bool,
}

impl ParamSpec {
    const fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind, normalize: Normalize::None, required: false }
    }

    const fn upper(mut self) -> Self {
        self.normalize = Normalize::Upper;
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

const fn path(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Path)
}
const fn boolean(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Bool)
}
const fn int(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Int)
}
const fn float(name: &'static str) -> ParamSpec {
    ParamSpec::new(name, ParamKind::Float)
}

/// Parameter names used by the typed accessors across the workspace.
pub mod keys {
    pub const WORKING_DIR: &str = "working_dir";
    pub const DEM_FILE: &str = "dem_file";
    pub const CLIMATE_FILE: &str = "climate_file";
    pub const RGI_VERSION: &str = "rgi_version";
    pub const USE_MULTIPROCESSING: &str = "use_multiprocessing";
    pub const MP_PROCESSES: &str = "mp_processes";
    pub const CONTINUE_ON_ERROR: &str = "continue_on_error";
    pub const AUTO_SKIP_TASK: &str = "auto_skip_task";
    pub const USE_COMPRESSION: &str = "use_compression";
    pub const GRID_DX_METHOD: &str = "grid_dx_method";
    pub const D1: &str = "d1";
    pub const D2: &str = "d2";
    pub const DMAX: &str = "dmax";
    pub const FIXED_DX: &str = "fixed_dx";
    pub const TOPO_INTERP: &str = "topo_interp";
    pub const BORDER: &str = "border";
    pub const USE_RGI_AREA: &str = "use_rgi_area";
    pub const LOCALMAX_WINDOW: &str = "localmax_window";
    pub const SMOOTH_WINDOW: &str = "smooth_window";
    pub const BASELINE_CLIMATE: &str = "baseline_climate";
    pub const HYDRO_MONTH_NH: &str = "hydro_month_nh";
    pub const HYDRO_MONTH_SH: &str = "hydro_month_sh";
    pub const TEMP_USE_LOCAL_GRADIENT: &str = "temp_use_local_gradient";
    pub const TEMP_DEFAULT_GRADIENT: &str = "temp_default_gradient";
    pub const TEMP_LOCAL_GRADIENT_BOUNDS: &str = "temp_local_gradient_bounds";
    pub const TSTAR_SEARCH_WINDOW: &str = "tstar_search_window";
    pub const MU_STAR_HALFPERIOD: &str = "mu_star_halfperiod";
    pub const PRCP_SCALING_FACTOR: &str = "prcp_scaling_factor";
    pub const MIN_MU_STAR: &str = "min_mu_star";
    pub const MAX_MU_STAR: &str = "max_mu_star";
    pub const TEMP_ALL_SOLID: &str = "temp_all_solid";
    pub const TEMP_ALL_LIQ: &str = "temp_all_liq";
    pub const TEMP_MELT: &str = "temp_melt";
    pub const ICE_DENSITY: &str = "ice_density";
    pub const GLEN_N: &str = "glen_n";
    pub const GLEN_A: &str = "glen_a";
    pub const FS: &str = "fs";
    pub const INVERSION_GLEN_A: &str = "inversion_glen_a";
    pub const INVERSION_FS: &str = "inversion_fs";
    pub const YS: &str = "ys";
    pub const YE: &str = "ye";
}

/// Every parameter the workflow knows, in file order.
pub static SCHEMA: &[ParamSpec] = &[
    // I/O
    path(keys::WORKING_DIR),
    path(keys::DEM_FILE),
    path(keys::CLIMATE_FILE),
    ParamSpec::new(keys::RGI_VERSION, ParamKind::Choice(RgiVersion::LITERALS)).required(),
    // execution
    boolean(keys::USE_MULTIPROCESSING).required(),
    int(keys::MP_PROCESSES),
    boolean(keys::CONTINUE_ON_ERROR).required(),
    boolean(keys::AUTO_SKIP_TASK).required(),
    boolean(keys::USE_COMPRESSION),
    boolean("use_tar_shapefiles"),
    boolean("compress_climate_netcdf"),
    boolean("use_download_verification"),
    int("mpi_recv_buf_size"),
    // grid
    ParamSpec::new(keys::GRID_DX_METHOD, ParamKind::Choice(GridDxMethod::LITERALS)).required(),
    float(keys::D1),
    float(keys::D2),
    float(keys::DMAX),
    float(keys::FIXED_DX),
    ParamSpec::new(keys::TOPO_INTERP, ParamKind::Choice(TopoInterp::LITERALS)).required(),
    int(keys::BORDER),
    boolean("clip_tidewater_border"),
    boolean(keys::USE_RGI_AREA),
    float(keys::LOCALMAX_WINDOW),
    float(keys::SMOOTH_WINDOW),
    boolean("use_multiple_flowlines"),
    // centerlines
    float("q1"),
    float("q2"),
    float("rmax"),
    float("f1"),
    float("f2"),
    float("a"),
    float("b"),
    float("kbuffer"),
    int("terminus_search_percentile"),
    float("terminus_search_altitude_range"),
    // flowlines and widths
    float("flowline_dx"),
    int("flowline_junction_pix"),
    float("flowline_height_smooth"),
    float("width_alt_range_thres"),
    int("min_n_per_bin"),
    float("base_binsize"),
    boolean("smooth_widths"),
    // climate
    ParamSpec::new(keys::BASELINE_CLIMATE, ParamKind::Str).upper(),
    int("baseline_y0"),
    int("baseline_y1"),
    int(keys::HYDRO_MONTH_NH),
    int(keys::HYDRO_MONTH_SH),
    boolean(keys::TEMP_USE_LOCAL_GRADIENT),
    float(keys::TEMP_DEFAULT_GRADIENT),
    ParamSpec::new(keys::TEMP_LOCAL_GRADIENT_BOUNDS, ParamKind::FloatPair),
    ParamSpec::new(keys::TSTAR_SEARCH_WINDOW, ParamKind::IntPair),
    int(keys::MU_STAR_HALFPERIOD),
    boolean("use_bias_for_run"),
    float(keys::PRCP_SCALING_FACTOR),
    boolean("allow_negative_mustar"),
    float(keys::MIN_MU_STAR),
    float(keys::MAX_MU_STAR),
    float(keys::TEMP_ALL_SOLID),
    float(keys::TEMP_ALL_LIQ),
    float(keys::TEMP_MELT),
    float("grad_prcp"),
    boolean("run_mb_calibration"),
    // inversion
    float("min_slope"),
    float("min_slope_ice_caps"),
    float(keys::INVERSION_FS),
    float(keys::INVERSION_GLEN_A),
    boolean("correct_for_neg_flux"),
    boolean("filter_for_neg_flux"),
    // flowline model
    float(keys::GLEN_A),
    float(keys::FS),
    float(keys::GLEN_N),
    float(keys::ICE_DENSITY),
    boolean("error_when_glacier_reaches_boundaries"),
    // calving
    boolean("use_kcalving_for_inversion"),
    boolean("use_kcalving_for_run"),
    float("calving_k"),
    // run period
    int(keys::YS),
    int(keys::YE),
];

/// Looks up the declaration of `name`.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static ParamSpec> {
    SCHEMA.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashSet;

    #[test]
    fn schema_names_are_unique() {
        let mut seen = FxHashSet::default();
        for spec in SCHEMA {
            assert!(seen.insert(spec.name), "duplicate schema entry {}", spec.name);
        }
    }

    #[test]
    fn lookup_finds_declared_keys() {
        assert_eq!(lookup("border").map(|s| s.kind), Some(ParamKind::Int));
        assert_eq!(lookup("baseline_climate").map(|s| s.normalize), Some(Normalize::Upper));
        assert!(lookup("no_such_key").is_none());
    }
}
