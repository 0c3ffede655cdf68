//! # Availability
//!
//! Interval math for rental admission.
//!
//! ## Overlap Rule
//! ```text
//! Periods are half-open: [start, end)
//!
//!   existing      [=========)
//!   proposed   [=====)                 overlap   (p.start < e.end && p.end > e.start)
//!   proposed             [=====)       overlap
//!   proposed                [=====)    touching: p.start == e.end → NO overlap
//!   proposed [==)                      touching: p.end == e.start → NO overlap
//! ```
//!
//! Only rentals in an active status ([`crate::types::BookingStatus::ACTIVE`]) hold the
//! calendar. Purchases, cancelled and completed bookings never conflict.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{Booking, BookingType};

/// Minimum rental length accepted at admission, in seconds (one day).
pub const MIN_RENTAL_SECS: i64 = 86_400;

/// A half-open rental period `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    /// Creates a period, rejecting empty or reversed ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::invalid_period("start must be before end"));
        }
        Ok(Period { start, end })
    }

    /// Creates a period from stored values without re-validating them.
    pub(crate) fn new_unchecked(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Period { start, end }
    }

    #[inline]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when the period is at least [`MIN_RENTAL_SECS`] long.
    #[inline]
    pub fn meets_minimum(&self) -> bool {
        self.duration() >= Duration::seconds(MIN_RENTAL_SECS)
    }

    /// True when the two half-open periods share at least one instant.
    #[inline]
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Availability {
    Free,
    Conflict { booking_id: String },
}

impl Availability {
    #[inline]
    pub fn is_free(&self) -> bool {
        matches!(self, Availability::Free)
    }
}

/// Returns the first active rental on `car_id` whose period overlaps `proposed`.
///
/// `existing` may contain anything; rows for other cars, purchases and
/// inactive statuses are skipped here so callers can pass a coarse query
/// result.
pub fn find_conflict<'a, I>(car_id: &str, proposed: &Period, existing: I) -> Option<&'a Booking>
where
    I: IntoIterator<Item = &'a Booking>,
{
    existing.into_iter().find(|booking| {
        booking.car_id == car_id
            && booking.booking_type == BookingType::Rental
            && booking.status.is_active()
            && booking
                .period()
                .map(|period| period.overlaps(proposed))
                .unwrap_or(false)
    })
}

/// Availability verdict for `proposed` against `existing`.
pub fn check_availability<'a, I>(car_id: &str, proposed: &Period, existing: I) -> Availability
where
    I: IntoIterator<Item = &'a Booking>,
{
    match find_conflict(car_id, proposed, existing) {
        Some(booking) => Availability::Conflict {
            booking_id: booking.id.clone(),
        },
        None => Availability::Free,
    }
}
