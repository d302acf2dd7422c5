use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Why a selector or output path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityViolation {
    Empty,
    Traversal,
    Absolute,
    Metacharacter(&'static str),
    OutsideRoot,
}

impl fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityViolation::Empty => write!(f, "empty selector"),
            SecurityViolation::Traversal => write!(f, "path traversal ('..') is not allowed"),
            SecurityViolation::Absolute => write!(f, "absolute paths are not allowed"),
            SecurityViolation::Metacharacter(m) => {
                write!(f, "shell metacharacter '{}' is not allowed", m.escape_debug())
            }
            SecurityViolation::OutsideRoot => write!(f, "resolves outside the trusted root"),
        }
    }
}

/// Untrusted input tried to escape the trusted directory tree.
///
/// Kept separate from [`SchemaError`] and the operational variants of
/// [`CompileError`] so callers can tell malicious input from malformed input.
#[derive(Debug, Clone, Error)]
#[error("security violation in '{selector}': {reason}")]
pub struct SecurityError {
    pub selector: String,
    pub reason: SecurityViolation,
}

impl SecurityError {
    pub fn new(selector: impl Into<String>, reason: SecurityViolation) -> Self {
        Self {
            selector: selector.into(),
            reason,
        }
    }
}

/// A rule card is missing required fields or has fields of the wrong type.
#[derive(Debug, Clone, Error)]
#[error("schema error in {}: {}", path.display(), problems.join("; "))]
pub struct SchemaError {
    pub path: PathBuf,
    pub problems: Vec<String>,
}

/// Coarse classification used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Security,
    Schema,
    Compiler,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Security => "security",
            ErrorKind::Schema => "schema",
            ErrorKind::Compiler => "compiler",
        };
        f.write_str(s)
    }
}

/// Every failure the compiler can surface.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML that the safe parser could not read.
    #[error("YAML parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("topic '{topic}' not found at {}", path.display())]
    MissingTopic { topic: String, path: PathBuf },

    #[error("duplicate rule id '{id}' in {} and {}", first.display(), second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("cannot write {}: {reason}", path.display())]
    Output { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Security(_) => ErrorKind::Security,
            CompileError::Schema(_) => ErrorKind::Schema,
            _ => ErrorKind::Compiler,
        }
    }

    /// The source file this error is about, when there is one.
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            CompileError::Schema(e) => Some(&e.path),
            CompileError::Io { path, .. }
            | CompileError::Parse { path, .. }
            | CompileError::MissingTopic { path, .. }
            | CompileError::Output { path, .. } => Some(path),
            CompileError::DuplicateId { second, .. } => Some(second),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        let sec: CompileError = SecurityError::new("../x", SecurityViolation::Traversal).into();
        let schema: CompileError = SchemaError {
            path: PathBuf::from("a.yml"),
            problems: vec!["missing field 'id'".into()],
        }
        .into();
        let dup = CompileError::DuplicateId {
            id: "X".into(),
            first: PathBuf::from("a.yml"),
            second: PathBuf::from("b.yml"),
        };

        assert_eq!(sec.kind(), ErrorKind::Security);
        assert_eq!(schema.kind(), ErrorKind::Schema);
        assert_eq!(dup.kind(), ErrorKind::Compiler);
    }

    #[test]
    fn duplicate_message_names_both_files() {
        let dup = CompileError::DuplicateId {
            id: "X".into(),
            first: PathBuf::from("a/X.yml"),
            second: PathBuf::from("b/X.yml"),
        };
        let msg = dup.to_string();
        assert!(msg.contains("a/X.yml"));
        assert!(msg.contains("b/X.yml"));
    }

    #[test]
    fn schema_error_lists_all_problems() {
        let err = SchemaError {
            path: PathBuf::from("c.yml"),
            problems: vec!["missing field 'id'".into(), "'do' must be a sequence".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("c.yml"));
        assert!(msg.contains("missing field 'id'; 'do' must be a sequence"));
    }

    #[test]
    fn error_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ErrorKind::Schema).unwrap(), "\"schema\"");
    }
}
