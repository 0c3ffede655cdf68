//! # Domain Types
//!
//! Core domain types used throughout Carlot.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Car        │   │    Booking      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  car_id         │◄──│  booking_id     │       │
//! │  │  owner_id       │   │  owner_id       │   │  gateway_order  │       │
//! │  │  daily_rate     │   │  type / status  │   │  amount         │       │
//! │  │  sale_price     │   │  start / end    │   │  status         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │        1 ─────── 0..n        1 ─────── 0..n                             │
//! │                                                                         │
//! │  BookingType    BookingStatus    PaymentStatus    PaymentMethod        │
//! │  rental         pending          pending          gateway              │
//! │  purchase       confirmed        completed        cash                 │
//! │                 completed        failed           bank_transfer        │
//! │                 cancelled        refunded                              │
//! │                                  cancelled                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status and method enums parse from their lowercase wire strings with
//! [`FromStr`]; anything else is a [`ValidationError::NotAllowed`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Implements `as_str`, `ALL`, `Display` and `FromStr` for a wire-string enum.
macro_rules! wire_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// The lowercase string stored in the database and accepted from callers.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($s => Ok($ty::$variant),)+
                    other => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        value: other.to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

// =============================================================================
// Booking Type
// =============================================================================

/// Whether a booking rents the car for a period or buys it outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Rental,
    Purchase,
}

wire_enum!(BookingType, "booking type", {
    Rental => "rental",
    Purchase => "purchase",
});

// =============================================================================
// Booking Status
// =============================================================================

/// Lifecycle status of a booking. See [`crate::lifecycle`] for the
/// transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

wire_enum!(BookingStatus, "booking status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl BookingStatus {
    /// Statuses that hold a car's calendar. Only these take part in
    /// conflict detection.
    pub const ACTIVE: &'static [BookingStatus] = &[BookingStatus::Pending, BookingStatus::Confirmed];

    /// Statuses from which a booking row may be deleted.
    pub const DELETABLE: &'static [BookingStatus] =
        &[BookingStatus::Pending, BookingStatus::Cancelled];

    #[inline]
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    #[inline]
    pub fn is_deletable(&self) -> bool {
        Self::DELETABLE.contains(self)
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

// =============================================================================
// Payment Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

wire_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
    Cancelled => "cancelled",
});

impl PaymentStatus {
    /// `failed`, `cancelled` and `refunded` never change again.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Failed | PaymentStatus::Cancelled | PaymentStatus::Refunded
        )
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Online payment through the external gateway (needs a gateway order).
    Gateway,
    Cash,
    BankTransfer,
}

wire_enum!(PaymentMethod, "payment method", {
    Gateway => "gateway",
    Cash => "cash",
    BankTransfer => "bank_transfer",
});

impl PaymentMethod {
    #[inline]
    pub fn uses_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Gateway)
    }
}

// =============================================================================
// Car
// =============================================================================

/// A car listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    /// Party that lists the car and receives bookings for it.
    pub owner_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Rental price per day in minor units; `None` if not for rent.
    pub daily_rate: Option<i64>,
    /// Fixed sale price in minor units; `None` if not for sale.
    pub sale_price: Option<i64>,
    /// Unlisted cars accept no new bookings.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for listing a new car. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCar {
    pub owner_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub daily_rate: Option<i64>,
    pub sale_price: Option<i64>,
}

// =============================================================================
// Booking
// =============================================================================

/// A reservation or purchase request against a car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub car_id: String,
    /// Owner of the car at the time of booking.
    pub owner_id: String,
    pub booking_type: BookingType,
    pub status: BookingStatus,
    /// Amount owed, in minor units.
    pub total_amount: i64,
    /// Rental start (inclusive). Always `None` for purchases.
    pub start_at: Option<DateTime<Utc>>,
    /// Rental end (exclusive). Always `None` for purchases.
    pub end_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The half-open rental period, if this is a rental with both instants.
    pub fn period(&self) -> Option<crate::availability::Period> {
        match (self.booking_type, self.start_at, self.end_at) {
            (BookingType::Rental, Some(start), Some(end)) => {
                Some(crate::availability::Period::new_unchecked(start, end))
            }
            _ => None,
        }
    }
}

/// A booking request as received from upstream handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub customer_id: String,
    pub car_id: String,
    pub owner_id: String,
    pub booking_type: BookingType,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A validated, priced booking ready to be persisted in `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub customer_id: String,
    pub car_id: String,
    pub owner_id: String,
    pub booking_type: BookingType,
    pub total_amount: i64,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment attempt against a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    /// Remote order id, set once the gateway order exists.
    pub gateway_order_id: Option<String>,
    /// Gateway payment id, set by verification.
    pub gateway_payment_id: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    /// Amount returned to the customer, set only when `refunded`.
    pub refunded_amount: Option<i64>,
    /// ISO 4217 code.
    pub currency: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A payment request as received from upstream handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub booking_id: String,
    pub amount: i64,
    /// Raw method string; validated against [`PaymentMethod`].
    pub method: String,
    pub description: Option<String>,
}

/// A validated payment ready to be persisted in `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub booking_id: String,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub description: Option<String>,
}

/// Field changes applied together with a payment status change.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentUpdate {
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub transaction_id: Option<String>,
    pub refunded_amount: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
