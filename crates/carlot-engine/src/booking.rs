//! # Booking Service
//!
//! Admission and lifecycle for bookings.
//!
//! ## Admission Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_booking(request)                                               │
//! │                                                                         │
//! │  1. validate_booking_request   ── ValidationError                       │
//! │  2. cars.get_car               ── NotFound                              │
//! │  3. car listed?                ── ValidationError                       │
//! │  4. owner matches car?         ── AuthorizationMismatch                 │
//! │  5. check_conflict (rentals)   ── Conflict(Overlap) / store failure     │
//! │                                   rejects (fail closed)                 │
//! │  6. price_booking              ── ValidationError                       │
//! │  7. bookings.insert_booking    ── Conflict(Overlap) if a concurrent     │
//! │                                   admission got there first             │
//! │                                                                         │
//! │  → Booking { status: pending }                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 5 gives callers a precise answer. Step 7 is what guarantees no two
//! active rentals of one car overlap: the store decides admission atomically
//! with the insert.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use carlot_core::availability::check_availability;
use carlot_core::lifecycle::check_booking_transition;
use carlot_core::pricing::price_booking;
use carlot_core::validation::{validate_booking_request, validate_reference};
use carlot_core::{
    Availability, Booking, BookingRequest, BookingStatus, BookingStore, CarStore, ConflictReason,
    CoreError, CoreResult, NewBooking, Period, StoreError, ValidationError,
};

/// Books cars for rent or sale.
#[derive(Clone)]
pub struct BookingService {
    cars: Arc<dyn CarStore>,
    bookings: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(cars: Arc<dyn CarStore>, bookings: Arc<dyn BookingStore>) -> Self {
        BookingService { cars, bookings }
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Validates, checks, prices and persists a booking in `pending`.
    pub async fn create_booking(&self, request: BookingRequest) -> CoreResult<Booking> {
        let period = validate_booking_request(&request)?;

        let car = self.cars.get_car(&request.car_id).await?;

        if !car.is_available {
            return Err(ValidationError::InvalidFormat {
                field: "car_id".to_string(),
                reason: format!("car {} is not available for booking", car.id),
            }
            .into());
        }

        if car.owner_id != request.owner_id {
            warn!(
                car_id = %car.id,
                supplied_owner = %request.owner_id,
                "Booking owner does not match car owner"
            );
            return Err(CoreError::AuthorizationMismatch {
                car_id: car.id,
                expected_owner: car.owner_id,
                supplied_owner: request.owner_id,
            });
        }

        if let Some(period) = &period {
            match self.availability(&car.id, period).await {
                Ok(Availability::Free) => {}
                Ok(Availability::Conflict { booking_id }) => {
                    info!(
                        car_id = %car.id,
                        conflicting_booking_id = %booking_id,
                        "Rental rejected: overlapping booking"
                    );
                    return Err(CoreError::Conflict(ConflictReason::Overlap {
                        car_id: car.id,
                        conflicting_booking_id: Some(booking_id),
                    }));
                }
                Err(e) => {
                    warn!(car_id = %car.id, error = %e, "Conflict check failed, rejecting booking");
                    return Err(e);
                }
            }
        }

        let total = price_booking(&car, request.booking_type, request.start_at, request.end_at)?;
        let car_id = car.id.clone();

        let booking = self
            .bookings
            .insert_booking(NewBooking {
                customer_id: request.customer_id,
                car_id: car.id,
                owner_id: request.owner_id,
                booking_type: request.booking_type,
                total_amount: total.minor(),
                start_at: request.start_at,
                end_at: request.end_at,
                notes: request.notes,
            })
            .await
            .map_err(|e| {
                if let StoreError::Conflict(ConflictReason::Overlap { .. }) = &e {
                    info!(car_id = %car_id, "Rental rejected at insert: overlapping booking admitted concurrently");
                }
                CoreError::from(e)
            })?;

        info!(
            booking_id = %booking.id,
            car_id = %booking.car_id,
            booking_type = %booking.booking_type,
            total = %total,
            "Booking created"
        );

        Ok(booking)
    }

    /// Reports whether `[start, end)` is free on `car_id`.
    ///
    /// Any store failure is returned as an error, never as `Free`.
    pub async fn check_conflict(
        &self,
        car_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Availability> {
        validate_reference("car_id", car_id)?;
        let period = Period::new(start, end)?;
        self.availability(car_id, &period).await
    }

    async fn availability(&self, car_id: &str, period: &Period) -> CoreResult<Availability> {
        let active = self.bookings.active_rentals_for_car(car_id).await?;
        let availability = check_availability(car_id, period, &active);

        debug!(
            car_id = %car_id,
            active = active.len(),
            free = availability.is_free(),
            "Checked availability"
        );

        Ok(availability)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Moves a booking to `status` (one of the four booking status strings).
    pub async fn update_status(&self, booking_id: &str, status: &str) -> CoreResult<Booking> {
        let next: BookingStatus = status.parse()?;
        let booking = self.bookings.get_booking(booking_id).await?;

        check_booking_transition(booking.status, next)?;

        let updated = self
            .bookings
            .update_booking_status(booking_id, booking.status, next)
            .await?;

        info!(
            booking_id = %booking_id,
            from = %booking.status,
            to = %next,
            "Booking status updated"
        );

        Ok(updated)
    }

    /// Deletes a booking that is `pending` or `cancelled`.
    ///
    /// A cancelled booking that still owns a completed or refunded payment
    /// is refused with [`ConflictReason::HasSettledPayment`].
    pub async fn delete_booking(&self, booking_id: &str) -> CoreResult<()> {
        let booking = self.bookings.get_booking(booking_id).await?;

        if !booking.status.is_deletable() {
            return Err(CoreError::Conflict(ConflictReason::NotDeletable {
                booking_id: booking.id,
                status: booking.status.to_string(),
            }));
        }

        self.bookings
            .delete_booking(booking_id, BookingStatus::DELETABLE)
            .await?;

        info!(booking_id = %booking_id, status = %booking.status, "Booking deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_booking(&self, booking_id: &str) -> CoreResult<Booking> {
        Ok(self.bookings.get_booking(booking_id).await?)
    }

    pub async fn bookings_for_customer(&self, customer_id: &str) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.bookings_for_customer(customer_id).await?)
    }

    pub async fn bookings_for_owner(&self, owner_id: &str) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.bookings_for_owner(owner_id).await?)
    }

    pub async fn bookings_for_car(&self, car_id: &str) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.bookings_for_car(car_id).await?)
    }

    pub async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        Ok(self.bookings.list_bookings().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carlot_core::{BookingType, StoreResult};

    use crate::testing::{at, engine, file_engine, listed_car, remove_db_files, CUSTOMER, OWNER};

    fn rental(car_id: &str, start_hours: i64, end_hours: i64) -> BookingRequest {
        BookingRequest {
            customer_id: CUSTOMER.to_string(),
            car_id: car_id.to_string(),
            owner_id: OWNER.to_string(),
            booking_type: BookingType::Rental,
            start_at: Some(at(start_hours)),
            end_at: Some(at(end_hours)),
            notes: None,
        }
    }

    fn purchase(car_id: &str) -> BookingRequest {
        BookingRequest {
            booking_type: BookingType::Purchase,
            start_at: None,
            end_at: None,
            ..rental(car_id, 0, 24)
        }
    }

    #[tokio::test]
    async fn test_rental_priced_per_day() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let booking = engine.bookings().create_booking(rental(&car.id, 0, 72)).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.total_amount, 300);
        assert_eq!(booking.start_at, Some(at(0)));
        assert_eq!(booking.end_at, Some(at(72)));

        let one_day = engine.bookings().create_booking(rental(&car.id, 72, 96)).await.unwrap();
        assert_eq!(one_day.total_amount, 100);
    }

    #[tokio::test]
    async fn test_rental_shorter_than_a_day_rejected() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let err = engine.bookings().create_booking(rental(&car.id, 0, 12)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidPeriod { .. })
        ));
    }

    #[tokio::test]
    async fn test_purchase_priced_at_sale_price() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, None, Some(550_000)).await;

        let first = engine.bookings().create_booking(purchase(&car.id)).await.unwrap();
        assert_eq!(first.total_amount, 550_000);
        assert_eq!(first.start_at, None);

        // purchases never take part in overlap checks
        let second = engine.bookings().create_booking(purchase(&car.id)).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_purchase_of_rental_only_car_rejected() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let err = engine.bookings().create_booking(purchase(&car.id)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(engine.bookings().list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_rental_rejected() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let first = engine.bookings().create_booking(rental(&car.id, 0, 72)).await.unwrap();
        let err = engine.bookings().create_booking(rental(&car.id, 48, 96)).await.unwrap_err();

        match err {
            CoreError::Conflict(ConflictReason::Overlap {
                car_id,
                conflicting_booking_id,
            }) => {
                assert_eq!(car_id, car.id);
                assert_eq!(conflicting_booking_id, Some(first.id));
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_touching_rentals_do_not_conflict() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        engine.bookings().create_booking(rental(&car.id, 0, 72)).await.unwrap();
        engine.bookings().create_booking(rental(&car.id, 72, 96)).await.unwrap();

        let verdict = engine
            .bookings()
            .check_conflict(&car.id, at(96), at(120))
            .await
            .unwrap();
        assert_eq!(verdict, Availability::Free);

        let verdict = engine
            .bookings()
            .check_conflict(&car.id, at(95), at(120))
            .await
            .unwrap();
        assert!(!verdict.is_free());
    }

    #[tokio::test]
    async fn test_cancelled_rental_frees_period() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let first = engine.bookings().create_booking(rental(&car.id, 0, 72)).await.unwrap();
        engine.bookings().update_status(&first.id, "cancelled").await.unwrap();

        engine.bookings().create_booking(rental(&car.id, 24, 48)).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_overlapping_admissions_admit_one() {
        let (engine, path) = file_engine(4).await;
        let car = listed_car(&engine, Some(100), None).await;

        let first = {
            let engine = engine.clone();
            let car_id = car.id.clone();
            tokio::spawn(async move { engine.bookings().create_booking(rental(&car_id, 0, 72)).await })
        };
        let second = {
            let engine = engine.clone();
            let car_id = car.id.clone();
            tokio::spawn(async move { engine.bookings().create_booking(rental(&car_id, 24, 96)).await })
        };
        let (a, b) = (first.await.unwrap(), second.await.unwrap());

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = a.err().or(b.err()).unwrap();
        assert!(matches!(
            loser,
            CoreError::Conflict(ConflictReason::Overlap { .. })
        ));
        assert_eq!(engine.bookings().bookings_for_car(&car.id).await.unwrap().len(), 1);

        engine.close().await;
        remove_db_files(&path);
    }

    #[tokio::test]
    async fn test_owner_mismatch_rejected() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let request = BookingRequest {
            owner_id: "someone-else".to_string(),
            ..rental(&car.id, 0, 48)
        };
        let err = engine.bookings().create_booking(request).await.unwrap_err();

        match err {
            CoreError::AuthorizationMismatch {
                expected_owner,
                supplied_owner,
                ..
            } => {
                assert_eq!(expected_owner, OWNER);
                assert_eq!(supplied_owner, "someone-else");
            }
            other => panic!("expected authorization mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlisted_and_unknown_cars_rejected() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;
        engine.database().cars().set_available(&car.id, false).await.unwrap();

        let err = engine.bookings().create_booking(rental(&car.id, 0, 48)).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = engine
            .bookings()
            .create_booking(rental("no-such-car", 0, 48))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lifecycle_follows_transition_table() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;
        let booking = engine.bookings().create_booking(rental(&car.id, 0, 48)).await.unwrap();

        let err = engine.bookings().update_status(&booking.id, "completed").await.unwrap_err();
        assert!(matches!(
            err.conflict_reason(),
            Some(ConflictReason::InvalidTransition { .. })
        ));

        let err = engine.bookings().update_status(&booking.id, "archived").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NotAllowed { .. })
        ));

        let confirmed = engine.bookings().update_status(&booking.id, "confirmed").await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let completed = engine.bookings().update_status(&booking.id, "completed").await.unwrap();
        assert_eq!(completed.status, BookingStatus::Completed);

        let err = engine.bookings().update_status(&booking.id, "cancelled").await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_only_pending_or_cancelled() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let confirmed = engine.bookings().create_booking(rental(&car.id, 0, 48)).await.unwrap();
        engine.bookings().update_status(&confirmed.id, "confirmed").await.unwrap();

        let err = engine.bookings().delete_booking(&confirmed.id).await.unwrap_err();
        assert!(matches!(
            err.conflict_reason(),
            Some(ConflictReason::NotDeletable { .. })
        ));

        engine.bookings().update_status(&confirmed.id, "cancelled").await.unwrap();
        engine.bookings().delete_booking(&confirmed.id).await.unwrap();

        let pending = engine.bookings().create_booking(rental(&car.id, 0, 48)).await.unwrap();
        engine.bookings().delete_booking(&pending.id).await.unwrap();

        let err = engine.bookings().get_booking(&pending.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_party_queries() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), Some(900_000)).await;

        engine.bookings().create_booking(rental(&car.id, 0, 48)).await.unwrap();
        engine.bookings().create_booking(purchase(&car.id)).await.unwrap();

        assert_eq!(engine.bookings().bookings_for_customer(CUSTOMER).await.unwrap().len(), 2);
        assert_eq!(engine.bookings().bookings_for_owner(OWNER).await.unwrap().len(), 2);
        assert!(engine.bookings().bookings_for_customer("nobody").await.unwrap().is_empty());
    }

    // =========================================================================
    // Fail-closed conflict check
    // =========================================================================

    struct BrokenBookings;

    #[async_trait]
    impl BookingStore for BrokenBookings {
        async fn get_booking(&self, id: &str) -> StoreResult<Booking> {
            Err(StoreError::not_found("Booking", id))
        }

        async fn active_rentals_for_car(&self, _car_id: &str) -> StoreResult<Vec<Booking>> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }

        async fn insert_booking(&self, _booking: NewBooking) -> StoreResult<Booking> {
            panic!("admission must not reach the insert when the conflict check failed")
        }

        async fn update_booking_status(
            &self,
            id: &str,
            _expected: BookingStatus,
            _next: BookingStatus,
        ) -> StoreResult<Booking> {
            Err(StoreError::not_found("Booking", id))
        }

        async fn delete_booking(&self, id: &str, _allowed: &[BookingStatus]) -> StoreResult<()> {
            Err(StoreError::not_found("Booking", id))
        }

        async fn bookings_for_car(&self, _car_id: &str) -> StoreResult<Vec<Booking>> {
            Ok(Vec::new())
        }

        async fn bookings_for_customer(&self, _customer_id: &str) -> StoreResult<Vec<Booking>> {
            Ok(Vec::new())
        }

        async fn bookings_for_owner(&self, _owner_id: &str) -> StoreResult<Vec<Booking>> {
            Ok(Vec::new())
        }

        async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_conflict_check_fails_closed() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let service = BookingService::new(Arc::new(engine.database().cars()), Arc::new(BrokenBookings));

        let err = service.create_booking(rental(&car.id, 0, 48)).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));

        let err = service.check_conflict(&car.id, at(0), at(48)).await.unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_check_conflict_rejects_reversed_range() {
        let (engine, _) = engine().await;
        let car = listed_car(&engine, Some(100), None).await;

        let err = engine.bookings().check_conflict(&car.id, at(48), at(0)).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidPeriod { .. })
        ));
    }
}
