//! # Booking Repository
//!
//! Database operations for bookings, including overlap-safe admission.
//!
//! ## Admission
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_booking(new rental)                                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── SELECT first active rental on car overlapping [start, end)        │
//! │   │     found? ──► ROLLBACK, Conflict(Overlap { Some(id) })             │
//! │   ├── INSERT booking (status = pending)                                 │
//! │   │     trigger bookings_no_overlap_insert fires                        │
//! │   │     aborted? ──► ROLLBACK, Conflict(Overlap { None })               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The overlap query names the conflicting booking. The trigger is what
//! makes admission safe: two writers whose overlap queries both came back
//! empty still cannot both commit overlapping rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{from_millis, to_millis};
use carlot_core::{
    Booking, BookingStatus, BookingStore, BookingType, ConflictReason, NewBooking, StoreError,
    StoreResult,
};

const BOOKING_COLUMNS: &str = "id, customer_id, car_id, owner_id, booking_type, status, \
                               total_amount, start_ms, end_ms, notes, created_at, updated_at";

/// Active rentals overlapping the half-open window `[?2, ?3)` on car `?1`.
const OVERLAP_QUERY: &str = r#"
    SELECT id FROM bookings
    WHERE car_id = ?1
      AND booking_type = 'rental'
      AND status IN ('pending', 'confirmed')
      AND start_ms < ?3
      AND end_ms > ?2
    ORDER BY start_ms
    LIMIT 1
"#;

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: String,
    customer_id: String,
    car_id: String,
    owner_id: String,
    booking_type: BookingType,
    status: BookingStatus,
    total_amount: i64,
    start_ms: Option<i64>,
    end_ms: Option<i64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> DbResult<Self> {
        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            car_id: row.car_id,
            owner_id: row.owner_id,
            booking_type: row.booking_type,
            status: row.status,
            total_amount: row.total_amount,
            start_at: from_millis(row.start_ms)?,
            end_at: from_millis(row.end_ms)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn fetch_booking<'e, E>(executor: E, id: &str) -> DbResult<Option<Booking>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let row: Option<BookingRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.map(Booking::try_from).transpose()
}

fn collect(rows: Vec<BookingRow>) -> DbResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

/// Outcome of the overlap query inside [`BookingRepository::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Admitted(Booking),
    /// An active rental on the same car overlaps; carries its id.
    Overlapping(String),
}

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Gets a booking by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Booking>> {
        fetch_booking(&self.pool, id).await
    }

    /// Inserts a `pending` booking, refusing overlapping active rentals.
    ///
    /// An overlap query hit comes back as [`Admission::Overlapping`]. An
    /// overlap only the trigger saw surfaces as [`DbError::Overlap`].
    pub async fn insert(&self, booking: NewBooking) -> DbResult<Admission> {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            customer_id: booking.customer_id,
            car_id: booking.car_id,
            owner_id: booking.owner_id,
            booking_type: booking.booking_type,
            status: BookingStatus::Pending,
            total_amount: booking.total_amount,
            start_at: booking.start_at,
            end_at: booking.end_at,
            notes: booking.notes,
            created_at: now,
            updated_at: now,
        };
        let start_ms = to_millis(booking.start_at);
        let end_ms = to_millis(booking.end_at);

        let mut tx = self.pool.begin().await?;

        if booking.booking_type == BookingType::Rental {
            // Take the write lock before reading. A deferred read snapshot that
            // later upgrades fails with SQLITE_BUSY instead of waiting out
            // busy_timeout.
            sqlx::query("UPDATE cars SET updated_at = updated_at WHERE id = ?1")
                .bind(&booking.car_id)
                .execute(&mut *tx)
                .await?;

            let conflicting: Option<String> = sqlx::query_scalar(OVERLAP_QUERY)
                .bind(&booking.car_id)
                .bind(start_ms)
                .bind(end_ms)
                .fetch_optional(&mut *tx)
                .await?;

            if let Some(conflicting) = conflicting {
                debug!(car_id = %booking.car_id, conflicting = %conflicting, "Overlapping rental found");
                return Ok(Admission::Overlapping(conflicting));
            }
        }

        debug!(
            id = %booking.id,
            car_id = %booking.car_id,
            booking_type = %booking.booking_type,
            "Inserting booking"
        );

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, customer_id, car_id, owner_id,
                booking_type, status, total_amount,
                start_ms, end_ms, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.customer_id)
        .bind(&booking.car_id)
        .bind(&booking.owner_id)
        .bind(booking.booking_type)
        .bind(booking.status)
        .bind(booking.total_amount)
        .bind(start_ms)
        .bind(end_ms)
        .bind(&booking.notes)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // Stored instants have millisecond precision; hand back what a
        // later read would return.
        let booking = Booking {
            start_at: from_millis(start_ms)?,
            end_at: from_millis(end_ms)?,
            ..booking
        };

        Ok(Admission::Admitted(booking))
    }

    /// Active rentals on a car, earliest first.
    pub async fn active_rentals(&self, car_id: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE car_id = ?1 AND booking_type = 'rental' AND status IN ('pending', 'confirmed') \
             ORDER BY start_ms"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(car_id)
            .fetch_all(&self.pool)
            .await?;

        collect(rows)
    }

    /// Compare-and-set status update. `Ok(None)` when the row is missing or
    /// no longer has status `expected`.
    pub async fn update_status(
        &self,
        id: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> DbResult<Option<Booking>> {
        debug!(id = %id, from = %expected, to = %next, "Updating booking status");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE bookings SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = fetch_booking(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Bookings matching `column = value`, newest first.
    async fn list_where(&self, column: &str, value: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = ?1 ORDER BY created_at DESC"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;

        collect(rows)
    }

    /// All bookings, newest first.
    pub async fn list(&self) -> DbResult<Vec<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC");
        let rows: Vec<BookingRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        collect(rows)
    }
}

// =============================================================================
// Store Contract
// =============================================================================

#[async_trait]
impl BookingStore for BookingRepository {
    async fn get_booking(&self, id: &str) -> StoreResult<Booking> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Booking", id))
    }

    async fn active_rentals_for_car(&self, car_id: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.active_rentals(car_id).await?)
    }

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let car_id = booking.car_id.clone();
        let overlap = |conflicting_booking_id| {
            StoreError::Conflict(ConflictReason::Overlap {
                car_id: car_id.clone(),
                conflicting_booking_id,
            })
        };

        match self.insert(booking).await {
            Ok(Admission::Admitted(booking)) => Ok(booking),
            Ok(Admission::Overlapping(conflicting)) => Err(overlap(Some(conflicting))),
            Err(DbError::Overlap) => Err(overlap(None)),
            Err(DbError::ForeignKeyViolation { .. }) => Err(StoreError::not_found("Car", &car_id)),
            Err(other) => Err(other.into()),
        }
    }

    async fn update_booking_status(
        &self,
        id: &str,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> StoreResult<Booking> {
        match self.update_status(id, expected, next).await {
            Ok(Some(booking)) => Ok(booking),
            Ok(None) => {
                // Tell a missing row from a lost race.
                self.get_booking(id).await?;
                Err(StoreError::Conflict(ConflictReason::StaleState {
                    entity: "booking".to_string(),
                    id: id.to_string(),
                    expected: expected.to_string(),
                }))
            }
            Err(DbError::Overlap) => {
                let car_id = self
                    .get_by_id(id)
                    .await?
                    .map(|b| b.car_id)
                    .unwrap_or_default();
                Err(StoreError::Conflict(ConflictReason::Overlap {
                    car_id,
                    conflicting_booking_id: None,
                }))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn delete_booking(&self, id: &str, allowed: &[BookingStatus]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let booking = fetch_booking(&mut *tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Booking", id))?;

        if !allowed.contains(&booking.status) {
            return Err(StoreError::Conflict(ConflictReason::NotDeletable {
                booking_id: id.to_string(),
                status: booking.status.to_string(),
            }));
        }

        let settled: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payments WHERE booking_id = ?1 AND status IN ('completed', 'refunded')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if settled > 0 {
            return Err(StoreError::Conflict(ConflictReason::HasSettledPayment {
                booking_id: id.to_string(),
            }));
        }

        debug!(id = %id, status = %booking.status, "Deleting booking");

        // Unsettled attempts (pending, failed, cancelled) go with the booking.
        sqlx::query("DELETE FROM payments WHERE booking_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        let result = sqlx::query("DELETE FROM bookings WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(booking.status)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(ConflictReason::StaleState {
                entity: "booking".to_string(),
                id: id.to_string(),
                expected: booking.status.to_string(),
            }));
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn bookings_for_car(&self, car_id: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.list_where("car_id", car_id).await?)
    }

    async fn bookings_for_customer(&self, customer_id: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.list_where("customer_id", customer_id).await?)
    }

    async fn bookings_for_owner(&self, owner_id: &str) -> StoreResult<Vec<Booking>> {
        Ok(self.list_where("owner_id", owner_id).await?)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        Ok(self.list().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
