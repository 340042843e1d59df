//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`NotFound`] thrown when an id does not resolve, or resolves to a record
//!   filtered out by an ownership/active-state check at lookup.
//! - [`Unauthorized`] thrown when a caller addresses a record it does not own.
//! - [`InvalidState`] thrown when the request is rejected by a domain rule
//!   (non-positive amount, bill payment not `scheduled`, ...).
//! - [`InsufficientFunds`] thrown when a debit would cross the balance floor.
//! - [`Conflict`] thrown on concurrent modification or id exhaustion.
//! - [`Storage`] thrown when the store could not execute or commit.
//!
//! `Conflict` and `Storage` are retryable from the top of the operation; the
//! unit of work is always rolled back before the error reaches the caller.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`InvalidState`]: EngineError::InvalidState
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`Conflict`]: EngineError::Conflict
//!  [`Storage`]: EngineError::Storage
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Storage(DbErr),
}

impl EngineError {
    /// Returns `true` when the same request may succeed if retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Storage(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
            return Self::Conflict(msg);
        }
        let msg = err.to_string().to_ascii_lowercase();
        if msg.contains("database is locked") || msg.contains("database is busy") {
            return Self::Conflict(err.to_string());
        }
        Self::Storage(err)
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_and_storage_are_retryable() {
        assert!(EngineError::Conflict("x".to_string()).is_retryable());
        assert!(EngineError::Storage(DbErr::Custom("io".to_string())).is_retryable());
        assert!(!EngineError::InsufficientFunds("x".to_string()).is_retryable());
        assert!(!EngineError::InvalidState("x".to_string()).is_retryable());
        assert!(!EngineError::NotFound("x".to_string()).is_retryable());
        assert!(!EngineError::Unauthorized("x".to_string()).is_retryable());
    }

    #[test]
    fn locked_database_maps_to_conflict() {
        let err = EngineError::from(DbErr::Custom("database is locked".to_string()));
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn other_db_errors_map_to_storage() {
        let err = EngineError::from(DbErr::Custom("disk I/O error".to_string()));
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
