//! Provider error types

use azdo_client::ClientError;
use azdo_core::{DefinitionError, ValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Failures parsing an import id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("import id is empty, expected {expected}")]
    ImportIdMissing { expected: &'static str },

    #[error("import id {id:?} has an invalid format, expected {expected}")]
    ImportIdInvalidFormat { id: String, expected: &'static str },

    #[error("resource type {0} does not support import")]
    Unsupported(String),
}

/// Errors surfaced to the host from resource callbacks
#[derive(Debug, Error)]
pub enum ProviderError {
    /// One or more configuration rules failed; nothing was sent to the service
    #[error("{}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// A REST call failed
    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: ClientError,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("invalid resource id {0:?}")]
    InvalidId(String),

    /// An attribute value the resource cannot act on
    #[error("invalid {field}: {message}")]
    InvalidAttribute { field: String, message: String },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("invalid resource state: {0}")]
    State(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn remote(context: impl Into<String>, source: ClientError) -> Self {
        Self::Remote {
            context: context.into(),
            source,
        }
    }

    /// Validation failures carried by this error, if any
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        match self {
            Self::Validation(errors) => errors.clone(),
            Self::Definition(DefinitionError::Validation(e)) => vec![e.clone()],
            _ => Vec::new(),
        }
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Attach context to a failed REST call
pub trait RemoteContext<T> {
    fn remote(self, context: impl Into<String>) -> Result<T>;
}

impl<T> RemoteContext<T> for std::result::Result<T, ClientError> {
    fn remote(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProviderError::remote(context, e))
    }
}
