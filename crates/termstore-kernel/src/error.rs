//! Error types for termstore editing operations.

use serde::{Deserialize, Serialize};

/// Errors raised by the editing core and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermstoreError {
    /// Malformed or self-contradicting input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced module, component or member does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// A caller-supplied identifier is already taken.
    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    /// A namespace could not supply enough unused identifiers.
    #[error(
        "namespace '{namespace}' exhausted for {category}: requested {requested}, allocated {allocated}"
    )]
    ExhaustedResource {
        namespace: String,
        category: String,
        requested: usize,
        allocated: usize,
    },

    /// A refset/member kind combination no handler is registered for.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Failure inside a storage or identifier collaborator.
    #[error("storage error: {0}")]
    Storage(String),
}

impl TermstoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// How the failure surfaces to whoever issued the edit.
    ///
    /// Missing references are always the caller's fault, never a server fault.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::NotFound { .. } => ErrorClass::BadRequest,
            Self::AlreadyExists { .. } => ErrorClass::Conflict,
            Self::ExhaustedResource { .. } => ErrorClass::Unavailable,
            Self::UnsupportedOperation(_) | Self::Storage(_) => ErrorClass::Internal,
        }
    }
}

/// Client-facing classification of a [`TermstoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    BadRequest,
    Conflict,
    Unavailable,
    Internal,
}

impl ErrorClass {
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::BadRequest | Self::Conflict)
    }
}
