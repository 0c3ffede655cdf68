//! # Repository Module
//!
//! SQLite implementations of the carlot-core store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BookingService                                                        │
//! │       │  bookings.insert_booking(new)                                   │
//! │       ▼                                                                 │
//! │  dyn BookingStore ──► BookingRepository                                │
//! │                       ├── inherent methods → DbResult<T>               │
//! │                       └── trait impl       → StoreResult<T>            │
//! │       │                                                                 │
//! │       ▼  SQL                                                            │
//! │  SQLite (triggers + unique indexes back the invariants)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are decoded into `*Row` structs via `sqlx::FromRow`, then converted
//! into the core types. Rental instants are stored as epoch milliseconds.
//!
//! ## Available Repositories
//!
//! - [`CarRepository`](car::CarRepository) - Car listings
//! - [`BookingRepository`](booking::BookingRepository) - Bookings and admission
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and settlement

pub mod booking;
pub mod car;
pub mod payment;

use chrono::{DateTime, Utc};

use crate::error::{DbError, DbResult};

pub(crate) fn to_millis(at: Option<DateTime<Utc>>) -> Option<i64> {
    at.map(|t| t.timestamp_millis())
}

pub(crate) fn from_millis(ms: Option<i64>) -> DbResult<Option<DateTime<Utc>>> {
    ms.map(|ms| {
        DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| DbError::Internal(format!("timestamp out of range: {ms}")))
    })
    .transpose()
}

#[cfg(test)]
pub(crate) mod test_support {
    use carlot_core::{Car, CarStore, NewCar};

    use crate::pool::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn seed_car(db: &Database, daily_rate: Option<i64>, sale_price: Option<i64>) -> Car {
        db.cars()
            .insert_car(NewCar {
                owner_id: "owner-1".to_string(),
                make: "Toyota".to_string(),
                model: "Corolla".to_string(),
                year: 2022,
                daily_rate,
                sale_price,
            })
            .await
            .unwrap()
    }
}
