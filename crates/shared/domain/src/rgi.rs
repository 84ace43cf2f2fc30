use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Supported Randolph Glacier Inventory releases.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum RgiVersion {
    #[strum(serialize = "50")]
    #[serde(rename = "50")]
    V50,
    #[strum(serialize = "60")]
    #[serde(rename = "60")]
    V60,
    #[default]
    #[strum(serialize = "61")]
    #[serde(rename = "61")]
    V61,
}

impl RgiVersion {
    /// Literals accepted by the `rgi_version` parameter.
    pub const LITERALS: &'static [&'static str] = &["50", "60", "61"];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RgiIdError {
    Malformed(String),
    UnsupportedVersion(String),
}

impl fmt::Display for RgiIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(id) => {
                write!(f, "malformed RGI id '{id}', expected e.g. RGI60-11.00897")
            },
            Self::UnsupportedVersion(v) => write!(f, "RGI version not supported: {v}"),
        }
    }
}

impl std::error::Error for RgiIdError {}

/// A glacier identifier such as `RGI60-11.00897`.
///
/// The layout is `RGI<version>-<region>.<number>`; the first 8 and 11
/// characters are used to shard glacier directories on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgiId(String);

impl RgiId {
    pub fn parse(raw: &str) -> Result<Self, RgiIdError> {
        let raw = raw.trim();
        let malformed = || RgiIdError::Malformed(raw.to_owned());

        let rest = raw.strip_prefix("RGI").ok_or_else(malformed)?;
        let (version, tail) = rest.split_once('-').ok_or_else(malformed)?;
        let (region, number) = tail.split_once('.').ok_or_else(malformed)?;

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if version.len() != 2 || region.len() != 2 || !all_digits(region) || !all_digits(number) {
            return Err(malformed());
        }
        RgiVersion::from_str(version)
            .map_err(|_| RgiIdError::UnsupportedVersion(version.to_owned()))?;

        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn version(&self) -> RgiVersion {
        // validated in `parse`
        RgiVersion::from_str(&self.0[3..5]).unwrap_or_default()
    }

    /// Two-digit first-order region, e.g. `"11"`.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.0[6..8]
    }

    /// Directory shards: `RGI60-11` and `RGI60-11.00`.
    #[must_use]
    pub fn shards(&self) -> (&str, &str) {
        let coarse = &self.0[..8];
        let fine = &self.0[..self.0.len().min(11)];
        (coarse, fine)
    }
}

impl fmt::Display for RgiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RgiId {
    type Err = RgiIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RgiId {
    type Error = RgiIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RgiId> for String {
    fn from(id: RgiId) -> Self {
        id.0
    }
}

impl AsRef<str> for RgiId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_components() {
        let id = RgiId::parse("RGI60-11.00897").unwrap();
        assert_eq!(id.version(), RgiVersion::V60);
        assert_eq!(id.region(), "11");
        assert_eq!(id.shards(), ("RGI60-11", "RGI60-11.00"));
    }

    #[test]
    fn rejects_unknown_versions_and_garbage() {
        assert_eq!(
            RgiId::parse("RGI40-11.00897"),
            Err(RgiIdError::UnsupportedVersion("40".into()))
        );
        assert!(matches!(RgiId::parse("RGI60_11.00897"), Err(RgiIdError::Malformed(_))));
        assert!(matches!(RgiId::parse("RGI60-1.00897"), Err(RgiIdError::Malformed(_))));
        assert!(matches!(RgiId::parse("RGI60-11."), Err(RgiIdError::Malformed(_))));
    }

    #[test]
    fn version_literals_match_enum() {
        let rendered: Vec<String> = RgiVersion::iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, RgiVersion::LITERALS);
        assert_eq!(RgiVersion::default(), RgiVersion::V61);
    }
}
