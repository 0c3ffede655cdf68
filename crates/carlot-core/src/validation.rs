//! # Validation Module
//!
//! Input validation for booking and payment requests.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Upstream handler                                             │
//! │  └── Deserialization into BookingRequest / PaymentRequest              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required references, lengths                                      │
//! │  ├── Rental period shape (start < end, ≥ 1 day, none for purchases)    │
//! │  └── Amounts, currency, refund bounds                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK constraints on status/type strings                          │
//! │  ├── Overlap trigger on active rentals                                 │
//! │  └── Unique completed payment per booking                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::availability::Period;
use crate::error::ValidationError;
use crate::types::{BookingRequest, BookingType};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of any entity or party reference.
pub const MAX_REFERENCE_LEN: usize = 64;

/// Maximum length of booking notes and payment descriptions.
pub const MAX_NOTES_LEN: usize = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an id or party reference.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_REFERENCE_LEN`] characters
/// - No embedded whitespace
///
/// ```rust
/// use carlot_core::validation::validate_reference;
///
/// assert!(validate_reference("car_id", "c-123").is_ok());
/// assert!(validate_reference("car_id", " ").is_err());
/// assert!(validate_reference("car_id", "a b").is_err());
/// ```
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates optional free text (notes, descriptions).
pub fn validate_notes(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(text) if text.len() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates an ISO 4217 style currency code (three uppercase ASCII letters).
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter uppercase code".to_string(),
        })
    }
}

// =============================================================================
// Booking Validators
// =============================================================================

/// Validates a booking request's shape before pricing and admission.
///
/// ## Rules
/// - customer, car and owner references are valid
/// - Rental: both instants present, start < end, at least one day
/// - Purchase: no instants
/// - Notes within length
pub fn validate_booking_request(request: &BookingRequest) -> ValidationResult<Option<Period>> {
    validate_reference("customer_id", &request.customer_id)?;
    validate_reference("car_id", &request.car_id)?;
    validate_reference("owner_id", &request.owner_id)?;
    validate_notes("notes", request.notes.as_deref())?;

    match request.booking_type {
        BookingType::Rental => {
            let start = request.start_at.ok_or_else(|| ValidationError::required("start date"))?;
            let end = request.end_at.ok_or_else(|| ValidationError::required("end date"))?;
            let period = Period::new(start, end)?;
            if !period.meets_minimum() {
                return Err(ValidationError::invalid_period(
                    "rentals must last at least one day",
                ));
            }
            Ok(Some(period))
        }
        BookingType::Purchase => {
            if request.start_at.is_some() || request.end_at.is_some() {
                return Err(ValidationError::invalid_period(
                    "purchases do not take start or end dates",
                ));
            }
            Ok(None)
        }
    }
}

// =============================================================================
// Payment Validators
// =============================================================================

/// Validates a payment amount in minor units.
pub fn validate_payment_amount(amount: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::must_be_positive("payment amount"));
    }
    Ok(())
}

/// Validates a refund against the original payment amount.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed `original`
pub fn validate_refund_amount(amount: i64, original: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::must_be_positive("refund amount"));
    }
    if amount > original {
        return Err(ValidationError::Exceeds {
            field: "refund amount".to_string(),
            value: amount,
            max: original,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, n, 9, 0, 0).unwrap()
    }

    fn request(booking_type: BookingType) -> BookingRequest {
        BookingRequest {
            customer_id: "cust-1".to_string(),
            car_id: "car-1".to_string(),
            owner_id: "owner-1".to_string(),
            booking_type,
            start_at: None,
            end_at: None,
            notes: None,
        }
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("id", "abc-123").is_ok());
        assert!(validate_reference("id", "").is_err());
        assert!(validate_reference("id", &"a".repeat(65)).is_err());
        assert!(validate_reference("id", "has\ttab").is_err());
    }

    #[test]
    fn test_rental_requires_dates() {
        let req = request(BookingType::Rental);
        assert_eq!(
            validate_booking_request(&req),
            Err(ValidationError::required("start date"))
        );
    }

    #[test]
    fn test_rental_rejects_reversed_and_short_periods() {
        let mut req = request(BookingType::Rental);
        req.start_at = Some(day(5));
        req.end_at = Some(day(3));
        assert!(matches!(
            validate_booking_request(&req),
            Err(ValidationError::InvalidPeriod { .. })
        ));

        req.start_at = Some(day(3));
        req.end_at = Some(day(3) + chrono::Duration::hours(12));
        assert!(matches!(
            validate_booking_request(&req),
            Err(ValidationError::InvalidPeriod { .. })
        ));

        req.end_at = Some(day(4));
        let period = validate_booking_request(&req).unwrap().unwrap();
        assert_eq!(period.start(), day(3));
    }

    #[test]
    fn test_purchase_rejects_dates() {
        let mut req = request(BookingType::Purchase);
        assert_eq!(validate_booking_request(&req), Ok(None));

        req.start_at = Some(day(1));
        assert!(validate_booking_request(&req).is_err());
    }

    #[test]
    fn test_notes_length() {
        let mut req = request(BookingType::Purchase);
        req.notes = Some("n".repeat(MAX_NOTES_LEN + 1));
        assert!(matches!(
            validate_booking_request(&req),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_currency() {
        assert!(validate_currency("INR").is_ok());
        assert!(validate_currency("inr").is_err());
        assert!(validate_currency("RUPEE").is_err());
    }

    #[test]
    fn test_refund_bounds() {
        assert!(validate_refund_amount(1000, 1000).is_ok());
        assert!(validate_refund_amount(1, 1000).is_ok());
        assert!(matches!(
            validate_refund_amount(1001, 1000),
            Err(ValidationError::Exceeds { .. })
        ));
        assert!(validate_refund_amount(0, 1000).is_err());
    }
}
