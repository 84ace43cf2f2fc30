//! Params files and the registry built from them.
//!
//! A params file is a flat list of `key = value` lines with `#` comments.
//! [`lexer`] splits it into raw entries, [`literal`] coerces each value to
//! the kind declared in [`schema`], and [`ParamsBuilder`] layers files,
//! environment variables and overrides into a read-only [`ParamRegistry`].

mod builder;
pub mod lexer;
pub mod literal;
mod registry;
pub mod schema;
pub mod views;

pub use builder::ParamsBuilder;
pub use literal::Normalize;
pub use registry::{FromParamValue, ParamChange, ParamEntry, ParamRegistry};
pub use schema::{DEFAULT_PARAMS, ParamSpec, SCHEMA, keys};
pub use views::{
    ClimateCalibration, FailurePolicy, GridDxPolicy, GridSettings, IceDynamics, Multiprocessing,
    PathSettings, RunPeriod, Settings,
};
