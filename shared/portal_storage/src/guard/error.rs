//! Error types for consistency and integrity guards

use thiserror::Error;

use crate::store::{CancellationReason, StoreError};

/// Result type alias for guarded operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Guard error types
#[derive(Debug, Error)]
pub enum GuardError {
    /// The referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// The record already exists
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record
        entity: String,
        /// Identifier that collided
        id: String,
    },

    /// The record changed since it was read; refresh and retry
    #[error("Record was modified concurrently")]
    ConcurrentModification,

    /// Dependents still reference the record
    #[error("{message}")]
    ReferentialIntegrityViolation {
        /// Collection holding the dependents
        dependents: String,
        /// Message for the caller
        message: String,
    },

    /// A record the write relies on is missing
    #[error("{0}")]
    MissingReference(String),

    /// The transaction was cancelled for a reason other than a failed condition
    #[error("Transaction failed: {reasons:?}")]
    TransactionFailed {
        /// Raw per-operation reasons
        reasons: Vec<CancellationReason>,
    },

    /// Too many operations for a single transaction
    #[error("Transaction has {count} operations, the maximum is {max}")]
    TransactionTooLarge {
        /// Queued operations
        count: usize,
        /// Store limit
        max: usize,
    },

    /// A record could not be mapped to or from its stored form
    #[error("Failed to map record: {0}")]
    Serialization(String),

    /// The store failed; passed through unchanged
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GuardError {
    /// Names the missing record when this is a `NotFound`
    #[must_use]
    pub fn for_entity(self, entity: &str, id: &str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            },
            other => other,
        }
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<serde_dynamo::Error> for GuardError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
