use std::borrow::Cow;

/// Errors raised while reading, coercing or querying parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Params I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Syntax error at line {line}{}: {message}", format_context(.context))]
    Syntax { line: usize, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error(
        "Duplicate parameter '{key}' at line {line} (first defined at line {first_line}){}",
        format_context(.context)
    )]
    DuplicateKey {
        key: String,
        line: usize,
        first_line: usize,
        context: Option<Cow<'static, str>>,
    },

    #[error("Parameter '{key}' expects {expected}, found '{found}'{}", format_context(.context))]
    TypeMismatch {
        key: String,
        expected: Cow<'static, str>,
        found: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown parameter '{key}'{}", format_context(.context))]
    UnknownKey { key: String, context: Option<Cow<'static, str>> },

    #[error("Parameter '{key}' is unset")]
    Unset { key: String },

    #[error("Invalid value for '{key}'{}: {message}", format_context(.context))]
    InvalidValue { key: String, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Environment overrides error{}: {source}", format_context(.context))]
    Env { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

impl ParamsError {
    pub(crate) fn mismatch(
        key: impl Into<String>,
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: expected.into(),
            found: found.into(),
            context: None,
        }
    }

    pub(crate) fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into(), context: None }
    }

    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidValue { key: key.into(), message: message.into(), context: None }
    }

    /// Sets the location shown after the message. Variants that already name
    /// their location are returned unchanged.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        match &mut self {
            Self::Io { context: c, .. }
            | Self::Syntax { context: c, .. }
            | Self::DuplicateKey { context: c, .. }
            | Self::TypeMismatch { context: c, .. }
            | Self::UnknownKey { context: c, .. }
            | Self::InvalidValue { context: c, .. }
            | Self::Env { context: c, .. } => *c = Some(context.into()),
            Self::Unset { .. } => {},
        }
        self
    }
}

/// Attaches a human-readable location (file name, layer) to an error.
pub trait ParamsErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ParamsError>;
}

impl<T> ParamsErrorExt<T> for Result<T, ParamsError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ParamsErrorExt<T> for Result<T, std::io::Error> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ParamsError> {
        self.map_err(|source| ParamsError::Io { source, context: Some(context.into()) })
    }
}

impl<T> ParamsErrorExt<T> for Result<T, config::ConfigError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, ParamsError> {
        self.map_err(|source| ParamsError::Env { source, context: Some(context.into()) })
    }
}

impl From<std::io::Error> for ParamsError {
    #[inline]
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

impl From<config::ConfigError> for ParamsError {
    #[inline]
    fn from(source: config::ConfigError) -> Self {
        Self::Env { source, context: None }
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
