use super::lexer::{RawDocument, RawValue, is_valid_key, scan, scan_value};
use super::literal::{Normalize, coerce, coerce_literal, infer};
use super::registry::{ParamEntry, ParamRegistry};
use super::schema::{DEFAULT_PARAMS, ParamSpec, keys, lookup};
use crate::error::{ParamsError, ParamsErrorExt};
use config::{Environment, Source};
use fxhash::FxHashMap;
use moraine_domain::constants::{ENV_PREFIX, ENV_USE_MULTIPROCESSING};
use moraine_domain::{ParamKind, ParamValue};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
enum Layer {
    File(PathBuf),
    Source { name: Cow<'static, str>, text: String },
    Env { prefix: String, vars: Option<config::Map<String, String>> },
    Set { key: String, literal: String },
}

/// Layered construction of a [`ParamRegistry`].
///
/// Layers apply in the order they are added, on top of the bundled defaults
/// (unless started from [`ParamsBuilder::empty`]). Every value is coerced
/// against the schema as its layer is applied, so the first malformed value
/// fails the build.
///
/// ```rust
/// use moraine_kernel::ParamsBuilder;
///
/// let params = ParamsBuilder::new()
///     .source_str("site", "border = 40\n")
///     .set("use_multiprocessing", "False")
///     .build()
///     .unwrap();
/// assert_eq!(params.get_int("border").unwrap(), 40);
/// assert!(!params.get_bool("use_multiprocessing").unwrap());
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct ParamsBuilder {
    with_defaults: bool,
    strict: bool,
    layers: Vec<Layer>,
}

impl Default for ParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamsBuilder {
    /// Starts from the bundled defaults.
    pub const fn new() -> Self {
        Self { with_defaults: true, strict: false, layers: Vec::new() }
    }

    /// Starts from nothing; only the added layers define keys.
    pub const fn empty() -> Self {
        Self { with_defaults: false, strict: false, layers: Vec::new() }
    }

    /// Rejects keys missing from the schema instead of inferring their kind.
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Applies a params file.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.layers.push(Layer::File(path.as_ref().to_path_buf()));
        self
    }

    /// Applies params text; `name` identifies it in errors and logs.
    pub fn source_str(
        mut self,
        name: impl Into<Cow<'static, str>>,
        text: impl Into<String>,
    ) -> Self {
        self.layers.push(Layer::Source { name: name.into(), text: text.into() });
        self
    }

    /// Applies `<PREFIX>__<KEY>` variables from the process environment, and
    /// the `<PREFIX>_USE_MULTIPROCESSING` switch.
    pub fn env(mut self, prefix: impl Into<String>) -> Self {
        self.layers.push(Layer::Env { prefix: prefix.into(), vars: None });
        self
    }

    /// Like [`ParamsBuilder::env`] with an explicit variable map.
    pub fn env_vars(
        mut self,
        prefix: impl Into<String>,
        vars: config::Map<String, String>,
    ) -> Self {
        self.layers.push(Layer::Env { prefix: prefix.into(), vars: Some(vars) });
        self
    }

    /// Overrides one value with a literal in params-file syntax.
    pub fn set(mut self, key: impl Into<String>, literal: impl Into<String>) -> Self {
        self.layers.push(Layer::Set { key: key.into(), literal: literal.into() });
        self
    }

    pub fn build(self) -> Result<ParamRegistry, ParamsError> {
        let mut draft = Draft { strict: self.strict, ..Draft::default() };

        if self.with_defaults {
            let doc = scan(DEFAULT_PARAMS).context("bundled defaults")?;
            draft.apply_document(doc, "bundled defaults")?;
        }

        for layer in self.layers {
            match layer {
                Layer::File(path) => {
                    let origin = path.display().to_string();
                    debug!("Applying params file {origin}");
                    let text = std::fs::read_to_string(&path).context(origin.clone())?;
                    let doc = scan(&text).context(origin.clone())?;
                    draft.apply_document(doc, &origin)?;
                },
                Layer::Source { name, text } => {
                    let doc = scan(&text).context(name.clone())?;
                    draft.apply_document(doc, &name)?;
                },
                Layer::Env { prefix, vars } => draft.apply_env(&prefix, vars)?,
                Layer::Set { key, literal } => draft.apply_literal(&key, &literal, "override")?,
            }
        }

        debug!(params = draft.entries.len(), "Params registry built");
        Ok(ParamRegistry::from_parts(draft.entries, draft.trailing))
    }
}

#[derive(Debug, Default)]
struct Draft {
    strict: bool,
    entries: Vec<ParamEntry>,
    index: FxHashMap<String, usize>,
    trailing: Vec<String>,
}

impl Draft {
    fn apply_document(&mut self, doc: RawDocument, origin: &str) -> Result<(), ParamsError> {
        for raw in doc.entries {
            let (kind, normalize, value, declared) = match lookup(&raw.key) {
                Some(spec) => {
                    let value = coerce_declared(spec, &raw.value)
                        .context(format!("{origin}, line {}", raw.line))?;
                    (spec.kind, spec.normalize, value, true)
                },
                None => {
                    if self.strict {
                        return Err(ParamsError::unknown(&raw.key)
                            .with_context(format!("{origin}, line {}", raw.line)));
                    }
                    let (kind, value) = self.infer_for(&raw.key, &raw.value, origin)?;
                    (kind, Normalize::None, value, false)
                },
            };
            self.upsert(raw.key, kind, normalize, value, declared, raw.leading, origin);
        }
        if self.trailing.is_empty() {
            self.trailing = doc.trailing;
        }
        Ok(())
    }

    fn apply_env(
        &mut self,
        prefix: &str,
        vars: Option<config::Map<String, String>>,
    ) -> Result<(), ParamsError> {
        let switch_name = if prefix == ENV_PREFIX {
            ENV_USE_MULTIPROCESSING.to_owned()
        } else {
            format!("{prefix}_USE_MULTIPROCESSING")
        };
        let switch = match &vars {
            Some(map) => map.get(&switch_name).cloned(),
            None => std::env::var(&switch_name).ok(),
        };

        let mut collected: Vec<(String, String)> = Environment::with_prefix(prefix)
            .separator("__")
            .source(vars)
            .collect()
            .context("collecting environment overrides")?
            .into_iter()
            .map(|(key, value)| Ok((key, value.into_string()?)))
            .collect::<Result<_, config::ConfigError>>()
            .context("reading environment overrides")?;
        collected.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, literal) in collected {
            let origin = format!("environment variable {prefix}__{}", key.to_uppercase());
            if lookup(&key).is_none() && !self.index.contains_key(&key) {
                if self.strict {
                    return Err(ParamsError::unknown(&key).with_context(origin));
                }
                warn!("Ignoring {origin}: no parameter named '{key}'");
                continue;
            }
            self.apply_literal(&key, &literal, &origin)?;
        }

        if let Some(raw) = switch {
            let enabled = parse_switch(&raw).ok_or_else(|| {
                ParamsError::invalid(
                    keys::USE_MULTIPROCESSING,
                    format!("{switch_name}={raw} is not 0 or 1"),
                )
            })?;
            info!(
                "Multiprocessing switch set to {enabled} by the {switch_name} environment variable"
            );
            self.upsert(
                keys::USE_MULTIPROCESSING.to_owned(),
                ParamKind::Bool,
                Normalize::None,
                ParamValue::Bool(enabled),
                true,
                Vec::new(),
                &switch_name,
            );
        }
        Ok(())
    }

    fn apply_literal(&mut self, key: &str, literal: &str, origin: &str) -> Result<(), ParamsError> {
        if !is_valid_key(key) {
            return Err(ParamsError::invalid(key, "not a valid parameter name")
                .with_context(origin.to_owned()));
        }

        let (kind, normalize, value, declared) = if let Some(spec) = lookup(key) {
            let raw = scan_value(literal)
                .map_err(|message| ParamsError::invalid(key, message))
                .context(origin.to_owned())?;
            let value = coerce_declared(spec, &raw).context(origin.to_owned())?;
            (spec.kind, spec.normalize, value, true)
        } else if let Some(existing) = self.entry(key) {
            let (kind, normalize) = (existing.kind, existing.normalize);
            let value = coerce_literal(key, kind, normalize, literal).context(origin.to_owned())?;
            (kind, normalize, value, false)
        } else {
            if self.strict {
                return Err(ParamsError::unknown(key).with_context(origin.to_owned()));
            }
            let raw = scan_value(literal)
                .map_err(|message| ParamsError::invalid(key, message))
                .context(origin.to_owned())?;
            let (kind, value) = self.infer_for(key, &raw, origin)?;
            (kind, Normalize::None, value, false)
        };

        self.upsert(key.to_owned(), kind, normalize, value, declared, Vec::new(), origin);
        Ok(())
    }

    fn infer_for(
        &self,
        key: &str,
        raw: &RawValue,
        origin: &str,
    ) -> Result<(ParamKind, ParamValue), ParamsError> {
        // A key seen in an earlier layer keeps the kind it was first given.
        if let Some(existing) = self.entry(key) {
            let value =
                coerce(key, existing.kind, existing.normalize, raw).context(origin.to_owned())?;
            return Ok((existing.kind, value));
        }
        warn!("Unknown parameter '{key}' in {origin}; keeping it as an inferred value");
        Ok(infer(raw))
    }

    fn entry(&self, key: &str) -> Option<&ParamEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    fn upsert(
        &mut self,
        key: String,
        kind: ParamKind,
        normalize: Normalize,
        value: ParamValue,
        declared: bool,
        leading: Vec<String>,
        origin: &str,
    ) {
        if let Some(&i) = self.index.get(&key) {
            let entry = &mut self.entries[i];
            if entry.value != value {
                info!(
                    "param '{key}' changed from {} to {} ({origin})",
                    shown(&entry.value),
                    shown(&value)
                );
                entry.value = value;
            }
            if entry.leading.is_empty() {
                entry.leading = leading;
            }
            return;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(ParamEntry { key, kind, value, declared, normalize, leading });
    }
}

fn coerce_declared(spec: &ParamSpec, raw: &RawValue) -> Result<ParamValue, ParamsError> {
    let value = coerce(spec.name, spec.kind, spec.normalize, raw)?;
    if spec.required && value.is_unset() {
        return Err(ParamsError::invalid(spec.name, "a value is required"));
    }
    Ok(value)
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn shown(value: &ParamValue) -> String {
    if value.is_unset() { "<unset>".to_owned() } else { value.to_string() }
}
