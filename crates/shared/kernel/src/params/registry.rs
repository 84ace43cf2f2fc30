use super::lexer::doc_from_leading;
use super::literal::{Normalize, render};
use super::builder::ParamsBuilder;
use crate::error::ParamsError;
use crate::paths::expand_path;
use fxhash::FxHashMap;
use moraine_domain::{BaselineClimate, GridDxMethod, ParamKind, ParamValue, RgiVersion, TopoInterp};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// One parameter as held by a registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamEntry {
    pub key: String,
    pub kind: ParamKind,
    pub value: ParamValue,
    /// `false` for keys absent from the schema (kind inferred from the text).
    pub declared: bool,
    pub(crate) normalize: Normalize,
    /// Comment and blank lines written above the entry.
    pub(crate) leading: Vec<String>,
}

impl ParamEntry {
    #[must_use]
    pub fn doc(&self) -> Option<String> {
        doc_from_leading(&self.leading)
    }

    /// The value in params-file literal form.
    ///
    /// Fails for a string that would not read back unchanged, such as one
    /// holding a line break.
    pub fn literal(&self) -> Result<String, ParamsError> {
        render(self.kind, &self.value).ok_or_else(|| {
            ParamsError::invalid(
                self.key.clone(),
                "value cannot be written back to a params file unchanged",
            )
        })
    }
}

/// A key whose value differs between two registries.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub key: String,
    /// `None` when the key is missing on that side.
    pub before: Option<ParamValue>,
    pub after: Option<ParamValue>,
}

impl fmt::Display for ParamChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: &Option<ParamValue>| match v {
            None => "<missing>".to_owned(),
            Some(ParamValue::Unset) => "<unset>".to_owned(),
            Some(v) => v.to_string(),
        };
        write!(f, "{}: {} -> {}", self.key, side(&self.before), side(&self.after))
    }
}

/// Read-only parameter registry.
///
/// Built once by [`ParamsBuilder`] and shared by cloning (the entries live
/// behind an `Arc`). Entries keep the order in which they were first defined.
#[derive(Debug, Clone)]
pub struct ParamRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    entries: Vec<ParamEntry>,
    index: FxHashMap<String, usize>,
    trailing: Vec<String>,
}

impl ParamRegistry {
    pub(crate) fn from_parts(entries: Vec<ParamEntry>, trailing: Vec<String>) -> Self {
        let index = entries.iter().enumerate().map(|(i, e)| (e.key.clone(), i)).collect();
        Self { inner: Arc::new(RegistryInner { entries, index, trailing }) }
    }

    /// Registry holding the bundled defaults only.
    pub fn defaults() -> Result<Self, ParamsError> {
        ParamsBuilder::new().build()
    }

    /// Builder seeded with the bundled defaults.
    #[must_use]
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::new()
    }

    /// Parses a standalone document, without the bundled defaults.
    pub fn parse(text: &str) -> Result<Self, ParamsError> {
        ParamsBuilder::empty().source_str("<inline>", text).build()
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&ParamEntry> {
        self.inner.index.get(key).map(|&i| &self.inner.entries[i])
    }

    pub fn get(&self, key: &str) -> Result<&ParamValue, ParamsError> {
        self.entry(key).map(|e| &e.value).ok_or_else(|| ParamsError::unknown(key))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.index.contains_key(key)
    }

    pub fn is_unset(&self, key: &str) -> Result<bool, ParamsError> {
        self.get(key).map(ParamValue::is_unset)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ParamsError> {
        self.get_as(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ParamsError> {
        self.get_as(key)
    }

    /// Floats, with integer values widened.
    pub fn get_float(&self, key: &str) -> Result<f64, ParamsError> {
        self.get_as(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ParamsError> {
        let value = self.get(key)?;
        match value {
            ParamValue::Str(s) => Ok(s),
            ParamValue::Unset => Err(ParamsError::Unset { key: key.to_owned() }),
            other => Err(ParamsError::mismatch(key, "string", other.to_string())),
        }
    }

    /// The expanded path, or `None` when the key is unset.
    pub fn get_path(&self, key: &str) -> Result<Option<PathBuf>, ParamsError> {
        self.get_as(key)
    }

    pub fn get_int_pair(&self, key: &str) -> Result<(i64, i64), ParamsError> {
        self.get_as(key)
    }

    pub fn get_float_pair(&self, key: &str) -> Result<(f64, f64), ParamsError> {
        self.get_as(key)
    }

    /// Converts the value of `key` with [`FromParamValue`].
    pub fn get_as<T: FromParamValue>(&self, key: &str) -> Result<T, ParamsError> {
        let value = self.get(key)?;
        if value.is_unset() {
            return T::from_unset().ok_or_else(|| ParamsError::Unset { key: key.to_owned() });
        }
        T::from_param(value)
            .ok_or_else(|| ParamsError::mismatch(key, T::EXPECTED, value.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamEntry> {
        self.inner.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// The comment block written directly above `key`.
    #[must_use]
    pub fn doc(&self, key: &str) -> Option<String> {
        self.entry(key).and_then(ParamEntry::doc)
    }

    /// Keys found in neither the schema nor the bundled defaults.
    pub fn undeclared(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|e| !e.declared).map(|e| e.key.as_str())
    }

    /// Writes the registry back in params-file form.
    ///
    /// Parsing the output under the same schema yields equal values; a value
    /// that cannot be written that way is an error.
    pub fn to_cfg_string(&self) -> Result<String, ParamsError> {
        let mut out = String::new();
        for entry in &self.inner.entries {
            for line in &entry.leading {
                out.push_str(line);
                out.push('\n');
            }
            let literal = entry.literal()?;
            if literal.is_empty() {
                out.push_str(&format!("{} =\n", entry.key));
            } else {
                out.push_str(&format!("{} = {literal}\n", entry.key));
            }
        }
        for line in &self.inner.trailing {
            out.push_str(line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Pretty JSON object of all values, in registry order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Keys whose values differ from `other`, in this registry's order
    /// followed by keys only `other` has.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<ParamChange> {
        let mut changes: Vec<ParamChange> = self
            .iter()
            .filter_map(|e| {
                let after = other.entry(&e.key).map(|o| &o.value);
                (after != Some(&e.value)).then(|| ParamChange {
                    key: e.key.clone(),
                    before: Some(e.value.clone()),
                    after: after.cloned(),
                })
            })
            .collect();
        changes.extend(other.iter().filter(|o| !self.contains(&o.key)).map(|o| ParamChange {
            key: o.key.clone(),
            before: None,
            after: Some(o.value.clone()),
        }));
        changes
    }
}

impl Serialize for ParamRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for entry in self.iter() {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

/// Conversion from a stored value for [`ParamRegistry::get_as`].
pub trait FromParamValue: Sized {
    /// Type description used in mismatch errors.
    const EXPECTED: &'static str;

    fn from_param(value: &ParamValue) -> Option<Self>;

    /// Value produced for an unset parameter; `None` makes unset an error.
    fn from_unset() -> Option<Self> {
        None
    }
}

impl<T: FromParamValue> FromParamValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_param(value: &ParamValue) -> Option<Self> {
        T::from_param(value).map(Some)
    }

    fn from_unset() -> Option<Self> {
        Some(None)
    }
}

impl FromParamValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParamValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_int()
    }
}

macro_rules! narrow_int {
    ($($ty:ty => $expected:literal),* $(,)?) => {$(
        impl FromParamValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_param(value: &ParamValue) -> Option<Self> {
                value.as_int().and_then(|i| <$ty>::try_from(i).ok())
            }
        }
    )*};
}

narrow_int!(i32 => "int (32-bit)", u32 => "non-negative int", usize => "non-negative int");

impl FromParamValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromParamValue for String {
    const EXPECTED: &'static str = "string";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromParamValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_str().map(expand_path)
    }
}

impl FromParamValue for (i64, i64) {
    const EXPECTED: &'static str = "int pair";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_int_pair()
    }
}

impl FromParamValue for (f64, f64) {
    const EXPECTED: &'static str = "float pair";

    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_float_pair()
    }
}

macro_rules! from_literal {
    ($($ty:ty => $expected:literal),* $(,)?) => {$(
        impl FromParamValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_param(value: &ParamValue) -> Option<Self> {
                value.as_str().and_then(|s| <$ty>::from_str(s).ok())
            }
        }
    )*};
}

from_literal!(
    RgiVersion => "RGI version (50, 60 or 61)",
    GridDxMethod => "grid dx method (fixed, linear or square)",
    TopoInterp => "interpolation (bilinear or cubic)",
    BaselineClimate => "baseline climate name",
);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParamRegistry {
        ParamRegistry::parse(
            "# spacing\nflag = True\ncount = 3\nratio = 2.5\nname = cubic\n\
             window = 0, 0\nbounds = -1., 1.\nempty =\n",
        )
        .unwrap()
    }

    #[test]
    fn typed_accessors() {
        let params = sample();
        assert!(params.get_bool("flag").unwrap());
        assert_eq!(params.get_int("count").unwrap(), 3);
        assert_eq!(params.get_float("count").unwrap(), 3.0);
        assert_eq!(params.get_float("ratio").unwrap(), 2.5);
        assert_eq!(params.get_str("name").unwrap(), "cubic");
        assert_eq!(params.get_int_pair("window").unwrap(), (0, 0));
        assert_eq!(params.get_float_pair("bounds").unwrap(), (-1.0, 1.0));
        assert_eq!(params.get_as::<TopoInterp>("name").unwrap(), TopoInterp::Cubic);
        assert_eq!(params.get_as::<u32>("count").unwrap(), 3);
    }

    #[test]
    fn accessor_errors() {
        let params = sample();
        assert!(matches!(params.get("nope"), Err(ParamsError::UnknownKey { .. })));
        assert!(matches!(params.get_bool("count"), Err(ParamsError::TypeMismatch { .. })));
        assert!(matches!(params.get_int("empty"), Err(ParamsError::Unset { .. })));
        assert_eq!(params.get_as::<Option<i64>>("empty").unwrap(), None);
        assert_eq!(params.get_path("empty").unwrap(), None);
        assert!(params.is_unset("empty").unwrap());
    }

    #[test]
    fn docs_and_order() {
        let params = sample();
        assert_eq!(params.doc("flag").as_deref(), Some("spacing"));
        assert_eq!(params.doc("count"), None);
        let keys: Vec<&str> = params.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["flag", "count", "ratio", "name", "window", "bounds", "empty"]);
        assert_eq!(params.undeclared().count(), 7);
    }

    #[test]
    fn diff_lists_changed_and_added_keys() {
        let a = ParamRegistry::parse("x = 1\ny = 2\n").unwrap();
        let b = ParamRegistry::parse("x = 1\ny = 3\nz = True\n").unwrap();
        let changes = a.diff(&b);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].to_string(), "y: 2 -> 3");
        assert_eq!(changes[1].to_string(), "z: <missing> -> True");
        assert!(a.diff(&a).is_empty());
    }

    #[test]
    fn json_keeps_registry_order() {
        let json = ParamRegistry::parse("b = 1\na =\n").unwrap().to_json().unwrap();
        assert_eq!(json, "{\n  \"b\": 1,\n  \"a\": null\n}");
    }
}
