use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store did not answer within the allotted time.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused the call.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A persisted row could not be mapped back to a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A write would violate a domain rule.
    #[error("Invalid record: {0}")]
    Invalid(#[from] domain::DomainError),

    /// A value does not fit the column it is written to.
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
