//! Path expansion for path-kind parameters.

use std::env;
use std::path::{Path, PathBuf};

/// Expands a leading `~` and `$VAR` / `${VAR}` references from the process
/// environment.
///
/// Unknown variables are left as written, so a missing variable surfaces as
/// an odd-looking path rather than a silently truncated one.
#[must_use]
pub fn expand_path(raw: impl AsRef<Path>) -> PathBuf {
    expand_path_with(raw, |name| env::var(name).ok())
}

/// [`expand_path`] with an explicit variable lookup.
pub fn expand_path_with<F>(raw: impl AsRef<Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let raw = raw.as_ref().to_string_lossy();
    let expanded = expand_vars(&raw, &lookup);
    PathBuf::from(expand_home(&expanded, &lookup))
}

#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    home_from(|name| env::var(name).ok()).map(PathBuf::from)
}

fn home_from<F: Fn(&str) -> Option<String>>(lookup: F) -> Option<String> {
    lookup("HOME").or_else(|| lookup("USERPROFILE")).filter(|h| !h.is_empty())
}

fn expand_home<F: Fn(&str) -> Option<String>>(raw: &str, lookup: &F) -> String {
    let Some(rest) = raw.strip_prefix('~') else {
        return raw.to_owned();
    };
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
        return raw.to_owned();
    }
    match home_from(lookup) {
        Some(home) => format!("{home}{rest}"),
        None => raw.to_owned(),
    }
}

fn expand_vars<F: Fn(&str) -> Option<String>>(raw: &str, lookup: &F) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "HOME" => Some("/home/glacier".to_owned()),
            "DATA_ROOT" => Some("/data".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn expands_home_and_variables() {
        let expand = |raw: &str| expand_path_with(raw, fake_env);
        assert_eq!(expand("~"), PathBuf::from("/home/glacier"));
        assert_eq!(expand("~/runs"), PathBuf::from("/home/glacier/runs"));
        assert_eq!(expand("$DATA_ROOT/dem.tif"), PathBuf::from("/data/dem.tif"));
        assert_eq!(expand("${DATA_ROOT}x/a"), PathBuf::from("/datax/a"));
        assert_eq!(expand("~/$DATA_ROOT"), PathBuf::from("/home/glacier//data"));
    }

    #[test]
    fn unknown_variables_are_kept() {
        let expand = |raw: &str| expand_path_with(raw, fake_env);
        assert_eq!(expand("$MISSING/a"), PathBuf::from("$MISSING/a"));
        assert_eq!(expand("${MISSING}/a"), PathBuf::from("${MISSING}/a"));
        assert_eq!(expand("${open"), PathBuf::from("${open"));
        assert_eq!(expand("cost$"), PathBuf::from("cost$"));
        assert_eq!(expand("~user/a"), PathBuf::from("~user/a"));
    }

    #[test]
    fn no_home_leaves_tilde() {
        assert_eq!(expand_path_with("~/a", |_| None), PathBuf::from("~/a"));
    }
}
