use crate::constants::{FALSE_LITERAL, TRUE_LITERAL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a parameter.
///
/// Kinds drive coercion of the raw text found in a params file. Every kind
/// accepts a blank value, which becomes [`ParamValue::Unset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    Path,
    /// A string restricted to one of the listed literals.
    Choice(&'static [&'static str]),
    IntPair,
    FloatPair,
}

impl ParamKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "string",
            Self::Path => "path",
            Self::Choice(_) => "choice",
            Self::IntPair => "int pair",
            Self::FloatPair => "float pair",
        }
    }

    /// Returns `true` if a value of this shape may be stored under the kind.
    #[must_use]
    pub fn admits(self, value: &ParamValue) -> bool {
        match (self, value) {
            (_, ParamValue::Unset) => true,
            (Self::Bool, ParamValue::Bool(_))
            | (Self::Int, ParamValue::Int(_))
            | (Self::Float, ParamValue::Float(_))
            | (Self::Str | Self::Path, ParamValue::Str(_))
            | (Self::IntPair, ParamValue::IntPair(..))
            | (Self::FloatPair, ParamValue::FloatPair(..)) => true,
            (Self::Choice(options), ParamValue::Str(s)) => options.contains(&s.as_str()),
            _ => false,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Choice(options) => write!(f, "one of [{}]", options.join(", ")),
            other => f.write_str(other.name()),
        }
    }
}

/// A typed parameter value.
///
/// `Display` renders the literal form used in params files, so that
/// `value.to_string()` parsed back under the same kind yields an equal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Blank in the file: resolved by an external default.
    Unset,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntPair(i64, i64),
    FloatPair(f64, f64),
}

impl ParamValue {
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The value as written in a params file, or `None` for a string that no
    /// quoting reads back unchanged.
    #[must_use]
    pub fn to_literal(&self) -> Option<String> {
        match self {
            Self::Str(s) => quote_if_needed(s),
            other => Some(other.to_string()),
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::IntPair(..) => "int pair",
            Self::FloatPair(..) => "float pair",
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to float.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_int_pair(&self) -> Option<(i64, i64)> {
        match self {
            Self::IntPair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float_pair(&self) -> Option<(f64, f64)> {
        match self {
            Self::FloatPair(a, b) => Some((*a, *b)),
            #[allow(clippy::cast_precision_loss)]
            Self::IntPair(a, b) => Some((*a as f64, *b as f64)),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Bool(true) => f.write_str(TRUE_LITERAL),
            Self::Bool(false) => f.write_str(FALSE_LITERAL),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Str(s) => match quote_if_needed(s) {
                Some(literal) => f.write_str(&literal),
                None => write!(f, "{s:?}"),
            },
            Self::IntPair(a, b) => write!(f, "{a}, {b}"),
            Self::FloatPair(a, b) => write!(f, "{}, {}", format_float(*a), format_float(*b)),
        }
    }
}

/// Shortest representation that parses back to the same bits.
///
/// Always contains a `.` or an exponent so the literal reads as a float.
#[must_use]
pub fn format_float(v: f64) -> String {
    format!("{v:?}")
}

/// Wraps `s` in a quote character that reads back unchanged.
///
/// A quoted value ends at the first quote followed only by blanks or a
/// comment, so `q` is usable when no `q` inside `s` is followed by blanks
/// and `#`. Returns `None` when neither quote works.
#[must_use]
pub fn quote(s: &str) -> Option<String> {
    if s.contains(['\n', '\r']) {
        return None;
    }
    let preferred = if s.contains('\'') { ['"', '\''] } else { ['\'', '"'] };
    preferred
        .into_iter()
        .find(|&q| {
            s.match_indices(q).all(|(pos, _)| !s[pos + 1..].trim_start().starts_with('#'))
        })
        .map(|q| format!("{q}{s}{q}"))
}

fn quote_if_needed(s: &str) -> Option<String> {
    let needs_quotes = s.is_empty()
        || s.trim() != s
        || s.contains('#')
        || s.contains(',')
        || s.starts_with('\'')
        || s.starts_with('"');
    if needs_quotes {
        quote(s)
    } else if s.contains(['\n', '\r']) {
        None
    } else {
        Some(s.to_owned())
    }
}
