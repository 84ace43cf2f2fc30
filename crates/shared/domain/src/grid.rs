use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// How the local map resolution of a glacier is chosen.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GridDxMethod {
    /// `dx = fixed_dx`
    Fixed,
    /// `dx = d1 * area + d2`, clipped to `[d2, dmax]`
    Linear,
    /// `dx = d1 * sqrt(area) + d2`, clipped to `[d2, dmax]`
    Square,
}

impl GridDxMethod {
    pub const LITERALS: &'static [&'static str] = &["fixed", "linear", "square"];
}

/// Interpolation used to project the topography onto the local grid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TopoInterp {
    Bilinear,
    Cubic,
}

impl TopoInterp {
    pub const LITERALS: &'static [&'static str] = &["bilinear", "cubic"];
}
