use moraine_domain::RgiIdError;
use moraine_kernel::ParamsError;
use std::borrow::Cow;

/// Workflow slice error type.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Workflow I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Params { source: ParamsError, context: Option<Cow<'static, str>> },

    #[error("JSON error{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("CSV error{}: {source}", format_context(.context))]
    Csv { source: csv::Error, context: Option<Cow<'static, str>> },

    #[error("Pattern error{}: {source}", format_context(.context))]
    Glob { source: globset::Error, context: Option<Cow<'static, str>> },

    #[error("Directory walk error{}: {source}", format_context(.context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    #[error("Compressed file is corrupted{}: {source}", format_context(.context))]
    Decompress {
        source: lz4_flex::block::DecompressError,
        context: Option<Cow<'static, str>>,
    },

    #[error("{source}{}", format_context(.context))]
    InvalidId { source: RgiIdError, context: Option<Cow<'static, str>> },

    #[error("'{basename}' is not a registered glacier directory file")]
    UnknownBasename { basename: String },

    /// Failure raised by a task body. `kind` names the failure class and is
    /// written to the task log in front of the message.
    #[error("{message}")]
    Task { kind: Cow<'static, str>, message: Cow<'static, str> },

    #[error("Task '{task}' failed for {rgi_id}: {source}")]
    TaskFailed { task: String, rgi_id: String, source: Box<WorkflowError> },

    #[error("Worker pool error{}: {message}", format_context(.context))]
    Pool { message: String, context: Option<Cow<'static, str>> },

    #[error("Workflow error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl WorkflowError {
    /// A task failure of the given class, e.g. `task("InvalidGeometry", "glacier too small")`.
    pub fn task(kind: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Task { kind: kind.into(), message: message.into() }
    }

    /// Class name written to task logs and error files.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Io { .. } => "IoError",
            Self::Params { .. } => "ParamsError",
            Self::Json { .. } => "JsonError",
            Self::Csv { .. } => "CsvError",
            Self::Glob { .. } => "PatternError",
            Self::Walk { .. } => "WalkError",
            Self::Decompress { .. } => "DecompressError",
            Self::InvalidId { .. } => "InvalidId",
            Self::UnknownBasename { .. } => "UnknownBasename",
            Self::Task { kind, .. } => kind,
            Self::TaskFailed { source, .. } => source.kind(),
            Self::Pool { .. } => "PoolError",
            Self::Internal { .. } => "InternalError",
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        match &mut self {
            Self::Io { context: c, .. }
            | Self::Params { context: c, .. }
            | Self::Json { context: c, .. }
            | Self::Csv { context: c, .. }
            | Self::Glob { context: c, .. }
            | Self::Walk { context: c, .. }
            | Self::Decompress { context: c, .. }
            | Self::InvalidId { context: c, .. }
            | Self::Pool { context: c, .. }
            | Self::Internal { context: c, .. } => *c = Some(context.into()),
            Self::UnknownBasename { .. } | Self::Task { .. } | Self::TaskFailed { .. } => {},
        }
        self
    }
}

pub trait WorkflowErrorExt<T> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, WorkflowError>;
}

impl<T, E> WorkflowErrorExt<T> for Result<T, E>
where
    E: Into<WorkflowError>,
{
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, WorkflowError> {
        self.map_err(|e| e.into().with_context(context))
    }
}

macro_rules! from_source {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for WorkflowError {
                #[inline]
                fn from(source: $ty) -> Self {
                    Self::$variant { source, context: None }
                }
            }
        )*
    };
}

from_source! {
    std::io::Error => Io,
    ParamsError => Params,
    serde_json::Error => Json,
    csv::Error => Csv,
    globset::Error => Glob,
    walkdir::Error => Walk,
    lz4_flex::block::DecompressError => Decompress,
    RgiIdError => InvalidId,
}

impl From<&'static str> for WorkflowError {
    #[inline]
    fn from(message: &'static str) -> Self {
        Self::Internal { message: Cow::Borrowed(message), context: None }
    }
}

impl From<String> for WorkflowError {
    #[inline]
    fn from(message: String) -> Self {
        Self::Internal { message: Cow::Owned(message), context: None }
    }
}

#[allow(clippy::ref_option)]
fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_appended_to_foreign_errors() {
        let res: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.context("dem.tif").unwrap_err();
        assert_eq!(err.to_string(), "Workflow I/O error (dem.tif): gone");
        assert_eq!(err.kind(), "IoError");
    }

    #[test]
    fn task_failures_keep_their_class() {
        let err = WorkflowError::task("InvalidGeometry", "glacier too small");
        assert_eq!(err.kind(), "InvalidGeometry");
        assert_eq!(err.to_string(), "glacier too small");

        let wrapped = WorkflowError::TaskFailed {
            task: "define_glacier_region".into(),
            rgi_id: "RGI60-11.00897".into(),
            source: Box::new(err),
        };
        assert_eq!(wrapped.kind(), "InvalidGeometry");
    }
}
