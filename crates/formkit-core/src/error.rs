//! Error types for formkit

use thiserror::Error;

/// Errors raised by collaborator ports (persistence, storage, drafts)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Entity not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller lacks permission
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Network or backend failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Write conflicted with existing state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payload could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PortError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type for port calls
pub type PortResult<T> = Result<T, PortError>;

/// Form builder error type
#[derive(Error, Debug)]
pub enum FormError {
    /// A field with the same id already exists
    #[error("duplicate field id: {0}")]
    DuplicateField(String),

    /// Field is not part of the form
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Form cannot be published without fields
    #[error("form has no fields")]
    NoFields,

    /// Form is not accepting submissions
    #[error("form closed")]
    FormClosed,

    /// Configured response limit reached
    #[error("response limit reached")]
    ResponseLimitReached,

    /// Reorder position outside the field list
    #[error("invalid move: position {position} outside 0..{len}")]
    InvalidMove {
        /// Requested position
        position: usize,
        /// Number of fields
        len: usize,
    },

    /// Collaborator failure
    #[error(transparent)]
    Port(#[from] PortError),

    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for form operations
pub type FormResult<T> = Result<T, FormError>;
