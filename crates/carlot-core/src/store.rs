//! # Persistence Interfaces
//!
//! The store traits the reservation engine consumes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carlot-engine                      carlot-db                           │
//! │  ─────────────                      ─────────                           │
//! │  BookingService ──► BookingStore ◄── BookingRepository (SQLite)         │
//! │                 ──► CarStore     ◄── CarRepository                      │
//! │  PaymentService ──► PaymentStore ◄── PaymentRepository                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract
//! - `insert_*` assigns identity and timestamps.
//! - Lookups by id return [`StoreError::NotFound`] for a missing row, never
//!   `Unavailable`.
//! - Every mutation is atomic. Status changes are compare-and-set on the
//!   expected current status; losing the race yields
//!   [`ConflictReason::StaleState`](crate::error::ConflictReason::StaleState).
//! - [`BookingStore::insert_booking`] must refuse an overlapping active
//!   rental on the same car atomically with the insert, reporting
//!   [`ConflictReason::Overlap`](crate::error::ConflictReason::Overlap).

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    Booking, BookingStatus, Car, NewBooking, NewCar, NewPayment, Payment, PaymentStatus,
    PaymentUpdate,
};

#[async_trait]
pub trait CarStore: Send + Sync {
    async fn insert_car(&self, car: NewCar) -> StoreResult<Car>;

    async fn get_car(&self, id: &str) -> StoreResult<Car>;

    async fn list_cars(&self) -> StoreResult<Vec<Car>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_booking(&self, id: &str) -> StoreResult<Booking>;

    /// Rentals on `car_id` in `pending` or `confirmed`.
    async fn active_rentals_for_car(&self, car_id: &str) -> StoreResult<Vec<Booking>>;

    /// Persists a `pending` booking. Rentals are admitted only if no active
    /// rental on the same car overlaps, decided in the same transaction as
    /// the insert.
    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking>;

    /// Moves a booking from `expected` to `next`.
    async fn update_booking_status(
        &self,
        id: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> StoreResult<Booking>;

    /// Deletes a booking whose current status is in `allowed`.
    async fn delete_booking(&self, id: &str, allowed: &[BookingStatus]) -> StoreResult<()>;

    async fn bookings_for_car(&self, car_id: &str) -> StoreResult<Vec<Booking>>;

    async fn bookings_for_customer(&self, customer_id: &str) -> StoreResult<Vec<Booking>>;

    async fn bookings_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Booking>>;

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, id: &str) -> StoreResult<Payment>;

    async fn payment_by_order_id(&self, gateway_order_id: &str) -> StoreResult<Payment>;

    async fn payments_for_booking(&self, booking_id: &str) -> StoreResult<Vec<Payment>>;

    async fn list_payments(&self) -> StoreResult<Vec<Payment>>;

    /// Persists a `pending` payment.
    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment>;

    /// Records the gateway order id on a payment that is still `pending`.
    async fn attach_order(&self, id: &str, gateway_order_id: &str) -> StoreResult<Payment>;

    /// Moves a payment from `expected` to `next`, writing `update` in the
    /// same statement.
    async fn transition_payment(
        &self,
        id: &str,
        expected: PaymentStatus,
        next: PaymentStatus,
        update: PaymentUpdate,
    ) -> StoreResult<Payment>;
}
