use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Reference climate datasets known to the calibration step.
///
/// The `baseline_climate` parameter is stored upper-cased; an unset value means
/// the caller supplies its own climate files.
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
pub enum BaselineClimate {
    #[strum(serialize = "CRU")]
    Cru,
    #[strum(serialize = "HISTALP")]
    Histalp,
    #[strum(serialize = "ERA5")]
    Era5,
    #[strum(serialize = "ERA5L")]
    Era5Land,
    #[strum(serialize = "CERA+ERA5")]
    CeraEra5,
    #[strum(serialize = "CERA+ERA5L")]
    CeraEra5Land,
    #[strum(serialize = "CUSTOM")]
    Custom,
}

impl BaselineClimate {
    pub const LITERALS: &'static [&'static str] =
        &["CRU", "HISTALP", "ERA5", "ERA5L", "CERA+ERA5", "CERA+ERA5L", "CUSTOM"];
}
