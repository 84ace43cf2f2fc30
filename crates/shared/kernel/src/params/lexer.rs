//! Line-oriented scanner for params files.
//!
//! The format is a flat list of `key = value` lines. Comment lines start with
//! `#`; an unquoted `#` after a value starts an inline comment. Comment and
//! blank lines are kept verbatim so a registry can be written back with its
//! original layout.

use crate::error::ParamsError;
use fxhash::FxHashMap;
use std::borrow::Cow;

/// The raw text of a value, before coercion to a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Nothing after the `=` (or only a comment).
    Blank,
    /// A single- or double-quoted string, quotes removed.
    Quoted(String),
    /// Unquoted text with inline comment and surrounding blanks removed.
    Bare(String),
}

impl RawValue {
    /// The text as written, quotes removed.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Blank => "",
            Self::Quoted(s) | Self::Bare(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawEntry {
    /// 1-based line number.
    pub line: usize,
    pub key: String,
    pub value: RawValue,
    /// Comment and blank lines between the previous entry and this one.
    pub leading: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    pub entries: Vec<RawEntry>,
    /// Comment and blank lines after the last entry.
    pub trailing: Vec<String>,
}

/// Splits a params file into entries.
///
/// Keys must be unique within one document.
pub fn scan(source: &str) -> Result<RawDocument, ParamsError> {
    let mut doc = RawDocument::default();
    let mut pending: Vec<String> = Vec::new();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            pending.push(raw_line.trim_end().to_owned());
            continue;
        }
        if line.starts_with('[') {
            return Err(syntax(line_no, "sections are not supported in a flat params file"));
        }

        let Some((key, rest)) = line.split_once('=') else {
            return Err(syntax(line_no, format!("expected 'key = value', found '{line}'")));
        };
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(syntax(line_no, format!("invalid parameter name '{key}'")));
        }
        let value = scan_value(rest).map_err(|message| syntax(line_no, message))?;

        if let Some(&first_line) = seen.get(key) {
            return Err(ParamsError::DuplicateKey {
                key: key.to_owned(),
                line: line_no,
                first_line,
                context: None,
            });
        }
        seen.insert(key.to_owned(), line_no);

        doc.entries.push(RawEntry {
            line: line_no,
            key: key.to_owned(),
            value,
            leading: std::mem::take(&mut pending),
        });
    }

    doc.trailing = pending;
    Ok(doc)
}

/// Scans the right-hand side of an entry (also used for override literals).
pub fn scan_value(text: &str) -> Result<RawValue, Cow<'static, str>> {
    let text = text.trim_start();
    let Some(first) = text.chars().next() else {
        return Ok(RawValue::Blank);
    };

    if first == '#' {
        return Ok(RawValue::Blank);
    }

    if first == '\'' || first == '"' {
        let body = &text[1..];
        // The closing quote is the first one followed only by blanks or a comment.
        for (pos, ch) in body.char_indices() {
            if ch != first {
                continue;
            }
            let after = body[pos + 1..].trim_start();
            if after.is_empty() || after.starts_with('#') {
                return Ok(RawValue::Quoted(body[..pos].to_owned()));
            }
        }
        return Err(Cow::Borrowed("unterminated quoted value"));
    }

    let bare = text.split_once('#').map_or(text, |(value, _comment)| value).trim_end();
    if bare.is_empty() { Ok(RawValue::Blank) } else { Ok(RawValue::Bare(bare.to_owned())) }
}

/// Documentation attached to an entry: the comment block directly above it.
#[must_use]
pub fn doc_from_leading(leading: &[String]) -> Option<String> {
    let block: Vec<&str> = leading
        .iter()
        .rev()
        .take_while(|line| line.trim_start().starts_with('#'))
        .map(|line| line.trim_start().trim_start_matches('#').trim())
        .collect();
    if block.is_empty() {
        return None;
    }
    let doc = block.into_iter().rev().collect::<Vec<_>>().join("\n");
    Some(doc)
}

pub(crate) fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn syntax(line: usize, message: impl Into<Cow<'static, str>>) -> ParamsError {
    ParamsError::Syntax { line, message: message.into(), context: None }
}
