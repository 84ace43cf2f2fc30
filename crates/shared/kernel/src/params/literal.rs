//! Coercion of raw text into typed values, and the inverse rendering.

use super::lexer::{RawValue, scan_value};
use crate::error::ParamsError;
use moraine_domain::constants::{FALSE_LITERAL, TRUE_LITERAL};
use moraine_domain::value::quote;
use moraine_domain::{ParamKind, ParamValue};

/// Text normalisation applied before a string value is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalize {
    #[default]
    None,
    Upper,
}

impl Normalize {
    fn apply(self, text: &str) -> String {
        match self {
            Self::None => text.to_owned(),
            Self::Upper => text.to_uppercase(),
        }
    }
}

/// Coerces a raw value to `kind`.
///
/// A blank value is always [`ParamValue::Unset`]. A quoted empty string is
/// unset for path kinds and an empty string otherwise.
pub fn coerce(
    key: &str,
    kind: ParamKind,
    normalize: Normalize,
    raw: &RawValue,
) -> Result<ParamValue, ParamsError> {
    let text = match raw {
        RawValue::Blank => return Ok(ParamValue::Unset),
        RawValue::Quoted(s) if s.is_empty() && kind == ParamKind::Path => {
            return Ok(ParamValue::Unset);
        },
        RawValue::Quoted(s) | RawValue::Bare(s) => s.as_str(),
    };
    let mismatch = || ParamsError::mismatch(key, kind.to_string(), text);

    match kind {
        ParamKind::Bool => parse_bool(text).map(ParamValue::Bool).ok_or_else(mismatch),
        ParamKind::Int => text.parse::<i64>().map(ParamValue::Int).map_err(|_| mismatch()),
        ParamKind::Float => parse_float(text).map(ParamValue::Float).ok_or_else(mismatch),
        ParamKind::Str | ParamKind::Path => Ok(ParamValue::Str(normalize.apply(text))),
        ParamKind::Choice(options) => {
            let value = normalize.apply(text);
            if options.contains(&value.as_str()) {
                Ok(ParamValue::Str(value))
            } else {
                Err(mismatch())
            }
        },
        ParamKind::IntPair => {
            let (a, b) = split_pair(text).ok_or_else(mismatch)?;
            match (a.parse::<i64>(), b.parse::<i64>()) {
                (Ok(a), Ok(b)) => Ok(ParamValue::IntPair(a, b)),
                _ => Err(mismatch()),
            }
        },
        ParamKind::FloatPair => {
            let (a, b) = split_pair(text).ok_or_else(mismatch)?;
            match (parse_float(a), parse_float(b)) {
                (Some(a), Some(b)) => Ok(ParamValue::FloatPair(a, b)),
                _ => Err(mismatch()),
            }
        },
    }
}

/// Coerces an override literal, such as a command-line or environment value.
pub fn coerce_literal(
    key: &str,
    kind: ParamKind,
    normalize: Normalize,
    literal: &str,
) -> Result<ParamValue, ParamsError> {
    let raw = scan_value(literal).map_err(|message| ParamsError::invalid(key, message))?;
    coerce(key, kind, normalize, &raw)
}

/// Best-effort kind for a key the schema does not know.
#[must_use]
pub fn infer(raw: &RawValue) -> (ParamKind, ParamValue) {
    let text = match raw {
        RawValue::Blank => return (ParamKind::Str, ParamValue::Unset),
        RawValue::Quoted(s) => return (ParamKind::Str, ParamValue::Str(s.clone())),
        RawValue::Bare(s) => s.as_str(),
    };

    if let Some(b) = parse_bool(text) {
        return (ParamKind::Bool, ParamValue::Bool(b));
    }
    if let Ok(i) = text.parse::<i64>() {
        return (ParamKind::Int, ParamValue::Int(i));
    }
    if let Some(v) = parse_float(text) {
        return (ParamKind::Float, ParamValue::Float(v));
    }
    if let Some((a, b)) = split_pair(text) {
        if let (Ok(a), Ok(b)) = (a.parse::<i64>(), b.parse::<i64>()) {
            return (ParamKind::IntPair, ParamValue::IntPair(a, b));
        }
        if let (Some(a), Some(b)) = (parse_float(a), parse_float(b)) {
            return (ParamKind::FloatPair, ParamValue::FloatPair(a, b));
        }
    }
    (ParamKind::Str, ParamValue::Str(text.to_owned()))
}

/// Renders `value` so that scanning and coercing it under `kind` gives it back.
///
/// `None` for strings that cannot be written on a single params line.
#[must_use]
pub fn render(kind: ParamKind, value: &ParamValue) -> Option<String> {
    let literal = value.to_literal()?;
    let ParamValue::Str(s) = value else {
        return Some(literal);
    };
    // A bare string that reads as another type (only matters for inferred keys).
    let reads_as_other = matches!(kind, ParamKind::Str)
        && literal == *s
        && !matches!(infer(&RawValue::Bare(s.clone())).1, ParamValue::Str(_));
    if reads_as_other {
        return quote(s);
    }
    Some(literal)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        TRUE_LITERAL => Some(true),
        FALSE_LITERAL => Some(false),
        _ => None,
    }
}

/// Accepts `50.`, `2.4e-24`, `-0.0065` and plain integers. Requires a digit so
/// words like `inf` stay strings.
fn parse_float(text: &str) -> Option<f64> {
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn split_pair(text: &str) -> Option<(&str, &str)> {
    let mut parts = text.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) if !a.is_empty() && !b.is_empty() => Some((a, b)),
        _ => None,
    }
}
