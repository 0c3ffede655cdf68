//! # Store Errors
//!
//! `DbError` sorts `sqlx` failures by what the repositories need to react
//! to: which constraint fired, or whether the store itself is unusable.
//!
//! ```text
//! sqlx::Error ──► DbError ──► StoreError (carlot-core) ──► CoreError
//!                  │
//!                  ├─ Overlap            trigger RAISE(ABORT, 'booking_overlap')
//!                  ├─ UniqueViolation    "<table>.<column>" of the index
//!                  ├─ ForeignKeyViolation
//!                  ├─ CheckViolation
//!                  └─ everything else    → StoreError::Unavailable
//! ```

use carlot_core::{ConflictReason, StoreError};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Text of the `RAISE(ABORT, ...)` in the overlap triggers.
pub(crate) const OVERLAP_TRIGGER_MESSAGE: &str = "booking_overlap";

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column` as SQLite reports it, e.g.
    /// `payments.booking_id` for a second settled payment.
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Referenced car or booking does not exist.
    #[error("Missing referenced row: {message}")]
    ForeignKeyViolation { message: String },

    /// An overlap trigger aborted the statement.
    #[error("Overlapping active rental")]
    Overlap,

    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    #[error("Could not connect: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Statement failed: {0}")]
    QueryFailed(String),

    #[error("Timed out waiting for a pooled connection")]
    PoolExhausted,

    #[error("Unexpected store error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the unique index on `field` rejected the write.
    pub fn is_unique_on(&self, field: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field: f } if f.contains(field))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();

                // triggers surface as plain SQLITE_CONSTRAINT, so check the text first
                if message.contains(OVERLAP_TRIGGER_MESSAGE) {
                    return DbError::Overlap;
                }

                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: message
                            .strip_prefix(UNIQUE_PREFIX)
                            .unwrap_or(&message)
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation => DbError::CheckViolation(message),
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Repositories translate constraint failures that carry ids (overlap with a
/// known booking, duplicate completion). What reaches this impl is a missing
/// row, an anonymous overlap, or the store failing.
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::Overlap => StoreError::Conflict(ConflictReason::Overlap {
                car_id: "unknown".to_string(),
                conflicting_booking_id: None,
            }),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_store_not_found() {
        let err: StoreError = DbError::not_found("Booking", "b-1").into();
        assert_eq!(err, StoreError::not_found("Booking", "b-1"));
    }

    #[test]
    fn test_infrastructure_errors_map_to_unavailable() {
        let err: StoreError = DbError::PoolExhausted.into();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err: StoreError = DbError::QueryFailed("disk I/O error".into()).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_is_unique_on() {
        let err = DbError::UniqueViolation {
            field: "payments.booking_id".to_string(),
        };
        assert!(err.is_unique_on("payments.booking_id"));
        assert!(!err.is_unique_on("payments.gateway_order_id"));
        assert!(!DbError::PoolExhausted.is_unique_on("payments.booking_id"));
    }
}
