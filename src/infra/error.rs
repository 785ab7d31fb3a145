//! Error types for the verification infrastructure

use thiserror::Error;

use crate::domain::{InvalidTransition, ValidationError, VerificationId};

/// Errors that can occur in stores and the verification engine
#[derive(Error, Debug)]
pub enum VerifierError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored JSON could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Submission rejected at the boundary
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Attempted to move a verification out of a terminal state
    #[error(transparent)]
    InvalidStateTransition(#[from] InvalidTransition),

    /// Update targeted a record that does not exist
    #[error("verification not found: {0}")]
    VerificationNotFound(VerificationId),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for verification operations
pub type Result<T> = std::result::Result<T, VerifierError>;
