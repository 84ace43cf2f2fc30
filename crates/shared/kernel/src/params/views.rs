//! Grouped, typed views over a registry.
//!
//! Each view reads its keys once and checks cross-key constraints in
//! `validate`. Unset values the workflow cannot default are reported as
//! [`ParamsError::Unset`] when the view is built.

use super::registry::ParamRegistry;
use super::schema::keys;
use crate::error::ParamsError;
use moraine_domain::{BaselineClimate, GridDxMethod, TopoInterp};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSettings {
    pub working_dir: Option<PathBuf>,
    pub dem_file: Option<PathBuf>,
    pub climate_file: Option<PathBuf>,
}

impl PathSettings {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        Ok(Self {
            working_dir: params.get_path(keys::WORKING_DIR)?,
            dem_file: params.get_path(keys::DEM_FILE)?,
            climate_file: params.get_path(keys::CLIMATE_FILE)?,
        })
    }

    /// The working directory, or an error naming the missing key.
    pub fn require_working_dir(&self) -> Result<&PathBuf, ParamsError> {
        self.working_dir
            .as_ref()
            .ok_or_else(|| ParamsError::Unset { key: keys::WORKING_DIR.to_owned() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Multiprocessing {
    pub enabled: bool,
    /// `-1` means all available cores.
    pub processes: i64,
}

impl Multiprocessing {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        let view = Self {
            enabled: params.get_bool(keys::USE_MULTIPROCESSING)?,
            processes: params.get_as::<Option<i64>>(keys::MP_PROCESSES)?.unwrap_or(-1),
        };
        view.validate()?;
        Ok(view)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.processes == 0 || self.processes < -1 {
            return Err(ParamsError::invalid(
                keys::MP_PROCESSES,
                format!("{} is not a process count (use -1 for all cores)", self.processes),
            ));
        }
        Ok(())
    }

    /// Number of workers to start; `1` when multiprocessing is off.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        match usize::try_from(self.processes) {
            Ok(n) if n > 0 => n,
            _ => std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailurePolicy {
    pub continue_on_error: bool,
    pub auto_skip_task: bool,
}

impl FailurePolicy {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        Ok(Self {
            continue_on_error: params.get_bool(keys::CONTINUE_ON_ERROR)?,
            auto_skip_task: params.get_bool(keys::AUTO_SKIP_TASK)?,
        })
    }
}

/// How the map resolution of a glacier follows from its area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum GridDxPolicy {
    Fixed { dx: f64 },
    Linear { d1: f64, d2: f64, dmax: f64 },
    Square { d1: f64, d2: f64, dmax: f64 },
}

impl GridDxPolicy {
    /// Grid spacing in meters for a glacier of `area_km2`.
    ///
    /// Area-based methods are rounded to the nearest integer and clipped to
    /// `[d2, dmax]`.
    #[must_use]
    pub fn dx_for_area(&self, area_km2: f64) -> f64 {
        match *self {
            Self::Fixed { dx } => dx.round_ties_even(),
            Self::Linear { d1, d2, dmax } => {
                (d1 * area_km2 + d2).round_ties_even().max(d2).min(dmax)
            },
            Self::Square { d1, d2, dmax } => {
                (d1 * area_km2.sqrt() + d2).round_ties_even().max(d2).min(dmax)
            },
        }
    }

    #[must_use]
    pub const fn method(&self) -> GridDxMethod {
        match self {
            Self::Fixed { .. } => GridDxMethod::Fixed,
            Self::Linear { .. } => GridDxMethod::Linear,
            Self::Square { .. } => GridDxMethod::Square,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridSettings {
    pub dx_policy: GridDxPolicy,
    pub topo_interp: TopoInterp,
    pub border: i64,
    pub use_rgi_area: bool,
    pub localmax_window: f64,
    pub smooth_window: f64,
}

impl GridSettings {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        let method: GridDxMethod = params.get_as(keys::GRID_DX_METHOD)?;
        let dx_policy = match method {
            GridDxMethod::Fixed => GridDxPolicy::Fixed { dx: params.get_float(keys::FIXED_DX)? },
            GridDxMethod::Linear => GridDxPolicy::Linear {
                d1: params.get_float(keys::D1)?,
                d2: params.get_float(keys::D2)?,
                dmax: params.get_float(keys::DMAX)?,
            },
            GridDxMethod::Square => GridDxPolicy::Square {
                d1: params.get_float(keys::D1)?,
                d2: params.get_float(keys::D2)?,
                dmax: params.get_float(keys::DMAX)?,
            },
        };
        let view = Self {
            dx_policy,
            topo_interp: params.get_as(keys::TOPO_INTERP)?,
            border: params.get_int(keys::BORDER)?,
            use_rgi_area: params.get_bool(keys::USE_RGI_AREA)?,
            localmax_window: params.get_float(keys::LOCALMAX_WINDOW)?,
            smooth_window: params.get_float(keys::SMOOTH_WINDOW)?,
        };
        view.validate()?;
        Ok(view)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        match self.dx_policy {
            GridDxPolicy::Fixed { dx } if dx <= 0.0 => {
                Err(ParamsError::invalid(keys::FIXED_DX, format!("must be positive, got {dx}")))
            },
            GridDxPolicy::Linear { d2, dmax, .. } | GridDxPolicy::Square { d2, dmax, .. }
                if d2 > dmax =>
            {
                Err(ParamsError::invalid(keys::DMAX, format!("dmax ({dmax}) is below d2 ({d2})")))
            },
            _ if self.border < 0 => {
                Err(ParamsError::invalid(keys::BORDER, "must not be negative"))
            },
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IceDynamics {
    pub ice_density: f64,
    pub glen_n: f64,
    pub glen_a: f64,
    pub fs: f64,
    pub inversion_glen_a: f64,
    pub inversion_fs: f64,
}

impl IceDynamics {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        Ok(Self {
            ice_density: params.get_float(keys::ICE_DENSITY)?,
            glen_n: params.get_float(keys::GLEN_N)?,
            glen_a: params.get_float(keys::GLEN_A)?,
            fs: params.get_float(keys::FS)?,
            inversion_glen_a: params.get_float(keys::INVERSION_GLEN_A)?,
            inversion_fs: params.get_float(keys::INVERSION_FS)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateCalibration {
    /// `None` when the caller provides its own climate files.
    pub baseline_climate: Option<BaselineClimate>,
    pub hydro_month_nh: u32,
    pub hydro_month_sh: u32,
    pub temp_use_local_gradient: bool,
    pub temp_default_gradient: f64,
    pub temp_local_gradient_bounds: (f64, f64),
    /// `(0, 0)` searches the whole available period.
    pub tstar_search_window: (i64, i64),
    pub mu_star_halfperiod: i64,
    pub prcp_scaling_factor: f64,
    pub min_mu_star: f64,
    pub max_mu_star: f64,
    pub temp_all_solid: f64,
    pub temp_all_liq: f64,
    pub temp_melt: f64,
}

impl ClimateCalibration {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        let view = Self {
            baseline_climate: params.get_as(keys::BASELINE_CLIMATE)?,
            hydro_month_nh: params.get_as(keys::HYDRO_MONTH_NH)?,
            hydro_month_sh: params.get_as(keys::HYDRO_MONTH_SH)?,
            temp_use_local_gradient: params.get_bool(keys::TEMP_USE_LOCAL_GRADIENT)?,
            temp_default_gradient: params.get_float(keys::TEMP_DEFAULT_GRADIENT)?,
            temp_local_gradient_bounds: params.get_float_pair(keys::TEMP_LOCAL_GRADIENT_BOUNDS)?,
            tstar_search_window: params.get_int_pair(keys::TSTAR_SEARCH_WINDOW)?,
            mu_star_halfperiod: params.get_int(keys::MU_STAR_HALFPERIOD)?,
            prcp_scaling_factor: params.get_float(keys::PRCP_SCALING_FACTOR)?,
            min_mu_star: params.get_float(keys::MIN_MU_STAR)?,
            max_mu_star: params.get_float(keys::MAX_MU_STAR)?,
            temp_all_solid: params.get_float(keys::TEMP_ALL_SOLID)?,
            temp_all_liq: params.get_float(keys::TEMP_ALL_LIQ)?,
            temp_melt: params.get_float(keys::TEMP_MELT)?,
        };
        view.validate()?;
        Ok(view)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        let months = [
            (keys::HYDRO_MONTH_NH, self.hydro_month_nh),
            (keys::HYDRO_MONTH_SH, self.hydro_month_sh),
        ];
        for (key, month) in months {
            if !(1..=12).contains(&month) {
                return Err(ParamsError::invalid(key, format!("{month} is not a month")));
            }
        }
        if self.min_mu_star > self.max_mu_star {
            return Err(ParamsError::invalid(
                keys::MIN_MU_STAR,
                format!(
                    "min_mu_star ({}) exceeds max_mu_star ({})",
                    self.min_mu_star, self.max_mu_star
                ),
            ));
        }
        let (low, high) = self.temp_local_gradient_bounds;
        if low > high {
            return Err(ParamsError::invalid(
                keys::TEMP_LOCAL_GRADIENT_BOUNDS,
                format!("bounds are reversed ({low}, {high})"),
            ));
        }
        Ok(())
    }
}

/// Simulation window. A `0` bound means the extent of the available data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunPeriod {
    pub ys: i64,
    pub ye: i64,
}

impl RunPeriod {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        let view = Self { ys: params.get_int(keys::YS)?, ye: params.get_int(keys::YE)? };
        view.validate()?;
        Ok(view)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.ys != 0 && self.ye != 0 && self.ys > self.ye {
            return Err(ParamsError::invalid(
                keys::YE,
                format!("run ends ({}) before it starts ({})", self.ye, self.ys),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn start(&self) -> Option<i64> {
        if self.ys == 0 { None } else { Some(self.ys) }
    }

    #[must_use]
    pub const fn end(&self) -> Option<i64> {
        if self.ye == 0 { None } else { Some(self.ye) }
    }
}

/// All views at once, validated together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub paths: PathSettings,
    pub multiprocessing: Multiprocessing,
    pub failure: FailurePolicy,
    pub grid: GridSettings,
    pub dynamics: IceDynamics,
    pub climate: ClimateCalibration,
    pub period: RunPeriod,
}

impl Settings {
    pub fn from_params(params: &ParamRegistry) -> Result<Self, ParamsError> {
        Ok(Self {
            paths: PathSettings::from_params(params)?,
            multiprocessing: Multiprocessing::from_params(params)?,
            failure: FailurePolicy::from_params(params)?,
            grid: GridSettings::from_params(params)?,
            dynamics: IceDynamics::from_params(params)?,
            climate: ClimateCalibration::from_params(params)?,
            period: RunPeriod::from_params(params)?,
        })
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        self.multiprocessing.validate()?;
        self.grid.validate()?;
        self.climate.validate()?;
        self.period.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_valid_settings() {
        let params = ParamRegistry::defaults().unwrap();
        let settings = Settings::from_params(&params).unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.paths.working_dir, None);
        assert_eq!(settings.grid.topo_interp, TopoInterp::Cubic);
        assert_eq!(settings.grid.dx_policy.method(), GridDxMethod::Square);
        assert_eq!(settings.climate.baseline_climate, Some(BaselineClimate::Cru));
        assert_eq!(settings.climate.tstar_search_window, (0, 0));
        assert_eq!(settings.period, RunPeriod { ys: 1990, ye: 2003 });
        assert_eq!(settings.dynamics.ice_density, 900.0);
    }

    #[test]
    fn dx_follows_area() {
        let square = GridDxPolicy::Square { d1: 14.0, d2: 10.0, dmax: 200.0 };
        assert_eq!(square.dx_for_area(0.0), 10.0);
        assert_eq!(square.dx_for_area(4.0), 38.0);
        assert_eq!(square.dx_for_area(1.0e6), 200.0);

        let linear = GridDxPolicy::Linear { d1: 14.0, d2: 10.0, dmax: 200.0 };
        assert_eq!(linear.dx_for_area(2.0), 38.0);
        assert_eq!(linear.dx_for_area(50.0), 200.0);

        assert_eq!(GridDxPolicy::Fixed { dx: 50.0 }.dx_for_area(123.0), 50.0);
    }

    #[test]
    fn process_count_rules() {
        let mp = |enabled, processes| Multiprocessing { enabled, processes };
        assert!(mp(true, 0).validate().is_err());
        assert!(mp(true, -2).validate().is_err());
        assert_eq!(mp(false, 8).effective_workers(), 1);
        assert_eq!(mp(true, 3).effective_workers(), 3);
        assert!(mp(true, -1).effective_workers() >= 1);
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let params = ParamRegistry::builder().set("d2", "300.").build().unwrap();
        let result = GridSettings::from_params(&params);
        assert!(matches!(result, Err(ParamsError::InvalidValue { .. })));

        let params = ParamRegistry::builder().set("hydro_month_nh", "13").build().unwrap();
        assert!(ClimateCalibration::from_params(&params).is_err());

        let params = ParamRegistry::builder().set("ys", "2010").set("ye", "2000").build().unwrap();
        assert!(RunPeriod::from_params(&params).is_err());

        let params = ParamRegistry::builder().set("ys", "2010").set("ye", "0").build().unwrap();
        assert_eq!(RunPeriod::from_params(&params).unwrap().end(), None);
    }

    #[test]
    fn working_dir_is_required_when_asked() {
        let params = ParamRegistry::defaults().unwrap();
        let paths = PathSettings::from_params(&params).unwrap();
        assert!(matches!(paths.require_working_dir(), Err(ParamsError::Unset { .. })));
    }
}
