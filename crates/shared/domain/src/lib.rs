//! # Domain Models
//!
//! Pure value types shared by the parameter kernel and the workflow crates,
//! with minimal dependencies (`serde`, `strum`).
//! Keep it lean: no I/O or parsing of files, just data and simple helpers.

pub mod climate;
pub mod constants;
pub mod grid;
pub mod rgi;
pub mod task;
pub mod value;

pub use climate::BaselineClimate;
pub use grid::{GridDxMethod, TopoInterp};
pub use rgi::{RgiId, RgiIdError, RgiVersion};
pub use task::TaskStatus;
pub use value::{ParamKind, ParamValue};
