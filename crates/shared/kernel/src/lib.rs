//! Parameter kernel for the glacier workflow.
//!
//! Parses flat `key = value` params files into a typed, read-only
//! [`ParamRegistry`], layers overrides on top of the bundled defaults, and
//! exposes grouped settings views for the workflow crates.
//!
//! ```rust
//! use moraine_kernel::ParamRegistry;
//!
//! let params = ParamRegistry::builder()
//!     .set("border", "80")
//!     .build()
//!     .unwrap();
//! assert_eq!(params.get_int("border").unwrap(), 80);
//! assert!(params.is_unset("dem_file").unwrap());
//! ```
pub mod config;
pub mod error;
pub mod params;
pub mod paths;

pub use error::{ParamsError, ParamsErrorExt};
pub use moraine_domain as domain;
pub use params::{
    FromParamValue, ParamChange, ParamEntry, ParamRegistry, ParamSpec, ParamsBuilder, Settings,
};
