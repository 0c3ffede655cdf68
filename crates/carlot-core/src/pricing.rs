//! # Pricing
//!
//! Amount owed for a booking request.
//!
//! ```text
//! Purchase:  total = car.sale_price                       (must be set, > 0)
//! Rental:    days  = max(1, floor(duration_hours / 24))
//!            total = car.daily_rate × days                (rate must be > 0)
//! ```
//!
//! A twelve-hour rental is charged as one day. Admission rejects rentals
//! shorter than a day before pricing runs, so the clamp only matters for
//! direct callers of [`price_rental`].

use chrono::{DateTime, Utc};

use crate::availability::Period;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{BookingType, Car};

/// Number of billable days in a rental period.
pub fn billable_days(period: &Period) -> i64 {
    (period.duration().num_hours() / 24).max(1)
}

/// Prices a rental from a daily rate and the requested instants.
pub fn price_rental(
    daily_rate: Option<i64>,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> Result<Money, ValidationError> {
    let rate = match daily_rate {
        Some(rate) if rate > 0 => rate,
        _ => return Err(ValidationError::must_be_positive("daily rate")),
    };

    let (start, end) = match (start_at, end_at) {
        (Some(start), Some(end)) => (start, end),
        (None, _) => return Err(ValidationError::required("start date")),
        (_, None) => return Err(ValidationError::required("end date")),
    };

    let period = Period::new(start, end)?;
    let days = billable_days(&period);

    Money::from_minor(rate)
        .checked_mul(days)
        .ok_or(ValidationError::Exceeds {
            field: "rental days".to_string(),
            value: days,
            max: i64::MAX / rate,
        })
}

/// Prices a purchase at the car's fixed sale price.
pub fn price_purchase(sale_price: Option<i64>) -> Result<Money, ValidationError> {
    match sale_price {
        Some(price) if price > 0 => Ok(Money::from_minor(price)),
        Some(_) => Err(ValidationError::must_be_positive("sale price")),
        None => Err(ValidationError::required("sale price")),
    }
}

/// Prices a booking of `booking_type` against `car`.
pub fn price_booking(
    car: &Car,
    booking_type: BookingType,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> Result<Money, ValidationError> {
    match booking_type {
        BookingType::Purchase => price_purchase(car.sale_price),
        BookingType::Rental => price_rental(car.daily_rate, start_at, end_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d0(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, hour, 0, 0).unwrap()
    }

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10 + n, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_half_day_charges_one_day() {
        let total = price_rental(Some(100), Some(d0(0)), Some(d0(12))).unwrap();
        assert_eq!(total.minor(), 100);
    }

    #[test]
    fn test_three_days() {
        let total = price_rental(Some(100), Some(day(0)), Some(day(3))).unwrap();
        assert_eq!(total.minor(), 300);
    }

    #[test]
    fn test_partial_days_are_floored() {
        // 2 days 23 hours
        let end = day(2) + chrono::Duration::hours(23);
        let total = price_rental(Some(100), Some(day(0)), Some(end)).unwrap();
        assert_eq!(total.minor(), 200);
    }

    #[test]
    fn test_rental_requires_positive_rate_and_dates() {
        assert!(price_rental(Some(0), Some(day(0)), Some(day(1))).is_err());
        assert!(price_rental(None, Some(day(0)), Some(day(1))).is_err());
        assert_eq!(
            price_rental(Some(100), None, Some(day(1))),
            Err(ValidationError::required("start date"))
        );
        assert_eq!(
            price_rental(Some(100), Some(day(0)), None),
            Err(ValidationError::required("end date"))
        );
    }

    #[test]
    fn test_rental_overflow_is_rejected() {
        let err = price_rental(Some(i64::MAX), Some(day(0)), Some(day(2))).unwrap_err();
        assert!(matches!(err, ValidationError::Exceeds { .. }));
    }

    #[test]
    fn test_purchase_uses_sale_price() {
        assert_eq!(price_purchase(Some(500_000_00)).unwrap().minor(), 500_000_00);
        assert_eq!(
            price_purchase(None),
            Err(ValidationError::required("sale price"))
        );
        assert!(price_purchase(Some(0)).is_err());
    }
}
