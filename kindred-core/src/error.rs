//! Error types for kindred operations

use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
///
/// `NotFound` is deliberately absent: a missing record is a valid outcome
/// (`Ok(None)`), cacheable by the loader, never an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Backend unreachable: {reason}")]
    Connection { reason: String },

    #[error("Backend operation failed: {reason}")]
    Backend { reason: String },

    #[error("Serialization failed for record {id}: {reason}")]
    Serialization { id: Uuid, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors for service-level inputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all kindred core errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// TESTS
// =============================================================================
