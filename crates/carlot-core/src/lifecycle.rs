//! # Lifecycle
//!
//! Transition tables for bookings and payments.
//!
//! ## Booking
//! ```text
//!   pending ──► confirmed ──► completed
//!      │            │
//!      └────────────┴──────► cancelled
//!
//!   completed, cancelled: terminal
//!   deletable only while pending or cancelled
//! ```
//!
//! ## Payment
//! ```text
//!   pending ──► completed ──► refunded
//!      │
//!      ├──────► failed
//!      └──────► cancelled
//!
//!   failed, cancelled, refunded: terminal
//! ```
//!
//! Both tables are plain `match` arms returning static slices, so the whole
//! mapping can be listed with [`booking_transitions`] / [`payment_transitions`]
//! and asserted on directly.

use crate::error::ConflictReason;
use crate::types::{BookingStatus, PaymentStatus};

/// Allowed next statuses for a booking in `from`.
pub const fn booking_next(from: BookingStatus) -> &'static [BookingStatus] {
    match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
        BookingStatus::Completed => &[],
        BookingStatus::Cancelled => &[],
    }
}

/// Allowed next statuses for a payment in `from`.
pub const fn payment_next(from: PaymentStatus) -> &'static [PaymentStatus] {
    match from {
        PaymentStatus::Pending => &[
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ],
        PaymentStatus::Completed => &[PaymentStatus::Refunded],
        PaymentStatus::Failed => &[],
        PaymentStatus::Refunded => &[],
        PaymentStatus::Cancelled => &[],
    }
}

/// The full booking table as `(from, allowed)` rows.
pub fn booking_transitions() -> Vec<(BookingStatus, &'static [BookingStatus])> {
    BookingStatus::ALL
        .iter()
        .map(|status| (*status, booking_next(*status)))
        .collect()
}

/// The full payment table as `(from, allowed)` rows.
pub fn payment_transitions() -> Vec<(PaymentStatus, &'static [PaymentStatus])> {
    PaymentStatus::ALL
        .iter()
        .map(|status| (*status, payment_next(*status)))
        .collect()
}

/// Checks `from → to` against the booking table.
pub fn check_booking_transition(from: BookingStatus, to: BookingStatus) -> Result<(), ConflictReason> {
    if booking_next(from).contains(&to) {
        Ok(())
    } else {
        Err(ConflictReason::InvalidTransition {
            entity: "booking".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Checks `from → to` against the payment table.
pub fn check_payment_transition(from: PaymentStatus, to: PaymentStatus) -> Result<(), ConflictReason> {
    if payment_next(from).contains(&to) {
        Ok(())
    } else {
        Err(ConflictReason::InvalidTransition {
            entity: "payment".to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_cannot_jump_to_completed() {
        let err = check_booking_transition(BookingStatus::Pending, BookingStatus::Completed)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid booking transition from pending to completed");
    }

    #[test]
    fn test_pending_confirmed_completed_path() {
        assert!(check_booking_transition(BookingStatus::Pending, BookingStatus::Confirmed).is_ok());
        assert!(check_booking_transition(BookingStatus::Confirmed, BookingStatus::Completed).is_ok());
    }

    #[test]
    fn test_terminal_booking_states_have_no_exits() {
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(booking_next(status).is_empty());
            for to in BookingStatus::ALL {
                assert!(check_booking_transition(status, *to).is_err());
            }
        }
    }

    #[test]
    fn test_booking_table_is_complete() {
        let table = booking_transitions();
        assert_eq!(table.len(), BookingStatus::ALL.len());
        let edges: usize = table.iter().map(|(_, next)| next.len()).sum();
        assert_eq!(edges, 4);
    }

    #[test]
    fn test_self_transitions_are_rejected() {
        for status in BookingStatus::ALL {
            assert!(check_booking_transition(*status, *status).is_err());
        }
        for status in PaymentStatus::ALL {
            assert!(check_payment_transition(*status, *status).is_err());
        }
    }

    #[test]
    fn test_payment_table() {
        assert!(check_payment_transition(PaymentStatus::Pending, PaymentStatus::Completed).is_ok());
        assert!(check_payment_transition(PaymentStatus::Completed, PaymentStatus::Refunded).is_ok());
        assert!(check_payment_transition(PaymentStatus::Pending, PaymentStatus::Refunded).is_err());
        assert!(check_payment_transition(PaymentStatus::Failed, PaymentStatus::Completed).is_err());

        for (from, next) in payment_transitions() {
            if from.is_terminal() {
                assert!(next.is_empty(), "{from} should be terminal");
            }
        }
    }
}
