//! Error types for definition codecs

use std::fmt;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// Stable identifiers for validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationKind {
    PathEmpty,
    PathMustStartWithBackslash,
    PathForbiddenChar,
    UrlTrailingSlash,
    UrlNotHttp,
    TaskFormatInvalid,
    UnknownTask,
    ServiceConnectionRequired,
    DuplicateVariableName,
    RepositoryBlockMissing,
    ConflictingBlocks,
}

impl ValidationKind {
    /// Stable string identifier, suitable for matching by callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathEmpty => "PathEmpty",
            Self::PathMustStartWithBackslash => "PathMustStartWithBackslash",
            Self::PathForbiddenChar => "PathForbiddenChar",
            Self::UrlTrailingSlash => "UrlTrailingSlash",
            Self::UrlNotHttp => "UrlNotHttp",
            Self::TaskFormatInvalid => "TaskFormatInvalid",
            Self::UnknownTask => "UnknownTask",
            Self::ServiceConnectionRequired => "ServiceConnectionRequired",
            Self::DuplicateVariableName => "DuplicateVariableName",
            Self::RepositoryBlockMissing => "RepositoryBlockMissing",
            Self::ConflictingBlocks => "ConflictingBlocks",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A validation failure with the field path it was raised for
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{kind}] {field}: {message}")]
pub struct ValidationError {
    /// Which rule failed
    pub kind: ValidationKind,
    /// Field path, e.g. `stage.0.job.1.agent`
    pub field: String,
    /// Human-readable description
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Prefix the field path with the location of the enclosing block
    pub fn within(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else {
            format!("{}.{}", parent, self.field)
        };
        self
    }
}

/// Errors raised while expanding or flattening definitions
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Configuration failed a validation rule
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A wire payload could not be (de)serialized
    #[error("malformed {context} payload: {source}")]
    MalformedPayload {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A wire payload was well-formed JSON but carried unexpected values
    #[error("unexpected {context} payload: {message}")]
    UnexpectedPayload { context: String, message: String },

    /// Stored state could not be upgraded
    #[error("state migration failed: {0}")]
    Migration(String),
}

impl DefinitionError {
    pub fn malformed(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedPayload {
            context: context.into(),
            source,
        }
    }

    pub fn unexpected(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedPayload {
            context: context.into(),
            message: message.into(),
        }
    }

    /// The validation kind, if this is a validation failure
    pub fn validation_kind(&self) -> Option<ValidationKind> {
        match self {
            Self::Validation(e) => Some(e.kind),
            _ => None,
        }
    }
}
