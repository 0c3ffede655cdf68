//! # Error Types
//!
//! Domain error types for carlot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  carlot-core (this file)                                               │
//! │  ├── ValidationError  - Malformed or missing input                     │
//! │  ├── ConflictReason   - Why a request collided with existing state     │
//! │  ├── StoreError       - What a persistence store may report            │
//! │  ├── GatewayError     - What a payment gateway client may report       │
//! │  └── CoreError        - The taxonomy every engine operation returns    │
//! │                                                                         │
//! │  carlot-db                                                             │
//! │  └── DbError          - sqlx failures, converted into StoreError       │
//! │                                                                         │
//! │  Flow: DbError → StoreError → CoreError → caller                       │
//! │        reqwest::Error → GatewayError → CoreError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in the core retries. Transient failures surface as
//! [`CoreError::Persistence`] or [`CoreError::ExternalService`] and the
//! caller decides whether to back off and try again.

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} '{value}' must be one of: {allowed:?}")]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// A rental interval is empty, reversed or too short.
    #[error("invalid rental period: {reason}")]
    InvalidPeriod { reason: String },

    /// Numeric value exceeds an upper bound set by existing state.
    #[error("{field} {value} exceeds maximum {max}")]
    Exceeds { field: String, value: i64, max: i64 },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn invalid_period(reason: impl Into<String>) -> Self {
        ValidationError::InvalidPeriod {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Conflict Reason
// =============================================================================

/// Why a request conflicts with the current state of a booking or payment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    /// Proposed rental period overlaps an active rental on the same car.
    ///
    /// `conflicting_booking_id` is `None` when the overlap was caught by the
    /// storage-level trigger rather than the admission query.
    #[error("car {car_id} is already booked for an overlapping period{}", fmt_conflicting(.conflicting_booking_id))]
    Overlap {
        car_id: String,
        conflicting_booking_id: Option<String>,
    },

    /// Status change outside the transition table.
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Payment already completed with a different gateway payment id.
    #[error("payment {payment_id} was already settled by gateway payment {existing_gateway_payment_id}")]
    AlreadySettled {
        payment_id: String,
        existing_gateway_payment_id: String,
    },

    /// Another payment for the booking already reached `completed`.
    #[error("booking {booking_id} already has a completed payment")]
    DuplicateCompletion { booking_id: String },

    /// Compare-and-set lost the race: the row no longer has the status the
    /// caller read.
    #[error("{entity} {id} is no longer {expected}")]
    StaleState {
        entity: String,
        id: String,
        expected: String,
    },

    /// Booking deletion attempted outside `pending`/`cancelled`.
    #[error("booking {booking_id} cannot be deleted while {status}")]
    NotDeletable { booking_id: String, status: String },

    /// Booking still owns a completed or refunded payment.
    #[error("booking {booking_id} has a settled payment and cannot be deleted")]
    HasSettledPayment { booking_id: String },

    /// Operation not permitted in the entity's current status.
    #[error("{entity} {id} is {status}, cannot {action}")]
    WrongStatus {
        entity: String,
        id: String,
        status: String,
        action: String,
    },
}

fn fmt_conflicting(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" (booking {id})"),
        None => String::new(),
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Failures a persistence store reports back to the engine.
///
/// `NotFound` is kept distinct from `Unavailable` so callers can tell a
/// missing row from a broken connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A storage-level constraint rejected the write.
    #[error("{0}")]
    Conflict(ConflictReason),

    /// Query, connection, pool or transaction failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Gateway Error
// =============================================================================

/// Failures from the external payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("gateway timed out after {after_secs}s")]
    Timeout { after_secs: u64 },

    /// Gateway answered with a non-success status.
    #[error("gateway rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway transport error: {0}")]
    Transport(String),

    /// Gateway answered 2xx but the body was unusable.
    #[error("gateway returned an invalid response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Core Error
// =============================================================================

/// Errors returned by every reservation and payment operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed or missing input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Interval overlap or illegal state change.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Supplied owner does not match the car's recorded owner.
    #[error("Owner {supplied_owner} does not own car {car_id}")]
    AuthorizationMismatch {
        car_id: String,
        expected_owner: String,
        supplied_owner: String,
    },

    /// Gateway unreachable, timed out or returned a non-success response.
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Signature verification failed for order {order_id}")]
    SignatureVerificationFailed { order_id: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the conflict reason, if this is a conflict.
    pub fn conflict_reason(&self) -> Option<&ConflictReason> {
        match self {
            CoreError::Conflict(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<ConflictReason> for CoreError {
    fn from(reason: ConflictReason) -> Self {
        CoreError::Conflict(reason)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::Conflict(reason) => CoreError::Conflict(reason),
            StoreError::Unavailable(msg) => CoreError::Persistence(msg),
        }
    }
}

impl From<GatewayError> for CoreError {
    fn from(err: GatewayError) -> Self {
        CoreError::ExternalService(err.to_string())
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::Conflict(ConflictReason::InvalidTransition {
            entity: "booking".to_string(),
            from: "pending".to_string(),
            to: "completed".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Conflict: invalid booking transition from pending to completed"
        );
    }

    #[test]
    fn test_overlap_message_names_conflicting_booking() {
        let reason = ConflictReason::Overlap {
            car_id: "car-1".to_string(),
            conflicting_booking_id: Some("bk-9".to_string()),
        };
        assert_eq!(
            reason.to_string(),
            "car car-1 is already booked for an overlapping period (booking bk-9)"
        );

        let reason = ConflictReason::Overlap {
            car_id: "car-1".to_string(),
            conflicting_booking_id: None,
        };
        assert_eq!(
            reason.to_string(),
            "car car-1 is already booked for an overlapping period"
        );
    }

    #[test]
    fn test_store_error_keeps_not_found_distinct() {
        let err: CoreError = StoreError::not_found("Booking", "b1").into();
        assert!(matches!(err, CoreError::NotFound { .. }));

        let err: CoreError = StoreError::Unavailable("disk I/O error".to_string()).into();
        assert!(matches!(err, CoreError::Persistence(_)));
    }

    #[test]
    fn test_gateway_timeout_is_external_service_error() {
        let err: CoreError = GatewayError::Timeout { after_secs: 10 }.into();
        assert!(matches!(err, CoreError::ExternalService(_)));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::required("car_id").into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: car_id is required");
    }
}
