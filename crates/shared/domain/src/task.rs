use crate::constants::SUCCESS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The last recorded outcome of a task in a glacier directory log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Success,
    /// `kind` is the error class name, `message` its rendered text.
    Failed { kind: String, message: String },
}

impl TaskStatus {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Parses the status field of a log line (`SUCCESS` or `Kind: message`).
    #[must_use]
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        if field == SUCCESS {
            return Self::Success;
        }
        match field.split_once(": ") {
            Some((kind, message)) => {
                Self::Failed { kind: kind.to_owned(), message: message.to_owned() }
            },
            None => Self::Failed { kind: field.to_owned(), message: String::new() },
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str(SUCCESS),
            Self::Failed { kind, message } if message.is_empty() => f.write_str(kind),
            Self::Failed { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_field_roundtrips() {
        for raw in ["SUCCESS", "InvalidGeometry: glacier too small", "Panic"] {
            assert_eq!(TaskStatus::parse(raw).to_string(), raw);
        }
        assert!(TaskStatus::parse("SUCCESS").is_success());
    }
}
