//! # Payment Repository
//!
//! Database operations for payments.
//!
//! ## Settlement Guarantees
//! - Status changes are compare-and-set: `UPDATE ... WHERE id = ? AND status = ?`.
//!   Two confirmations racing on one payment cannot both win.
//! - `idx_payments_one_settled` allows one `completed`/`refunded` row per
//!   booking. A second completion surfaces as
//!   [`ConflictReason::DuplicateCompletion`].
//! - `gateway_order_id` is unique, so an order maps to at most one payment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use carlot_core::{
    ConflictReason, NewPayment, Payment, PaymentMethod, PaymentStatus, PaymentStore,
    PaymentUpdate, StoreError, StoreResult,
};

const PAYMENT_COLUMNS: &str = "id, booking_id, gateway_order_id, gateway_payment_id, amount, \
                               refunded_amount, currency, status, method, transaction_id, \
                               description, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    booking_id: String,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    amount: i64,
    refunded_amount: Option<i64>,
    currency: String,
    status: PaymentStatus,
    method: PaymentMethod,
    transaction_id: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            booking_id: row.booking_id,
            gateway_order_id: row.gateway_order_id,
            gateway_payment_id: row.gateway_payment_id,
            amount: row.amount,
            refunded_amount: row.refunded_amount,
            currency: row.currency,
            status: row.status,
            method: row.method,
            transaction_id: row.transaction_id,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

async fn fetch_payment<'e, E>(executor: E, column: &str, value: &str) -> DbResult<Option<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE {column} = ?1");
    let row: Option<PaymentRow> = sqlx::query_as(&sql)
        .bind(value)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Payment::from))
}

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        fetch_payment(&self.pool, "id", id).await
    }

    /// Gets the payment a gateway order belongs to.
    pub async fn get_by_order_id(&self, gateway_order_id: &str) -> DbResult<Option<Payment>> {
        fetch_payment(&self.pool, "gateway_order_id", gateway_order_id).await
    }

    /// Inserts a `pending` payment.
    pub async fn insert(&self, payment: NewPayment) -> DbResult<Payment> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            booking_id: payment.booking_id,
            gateway_order_id: None,
            gateway_payment_id: None,
            amount: payment.amount,
            refunded_amount: None,
            currency: payment.currency,
            status: PaymentStatus::Pending,
            method: payment.method,
            transaction_id: None,
            description: payment.description,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %payment.id,
            booking_id = %payment.booking_id,
            amount = payment.amount,
            method = %payment.method,
            "Inserting payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, amount, currency,
                status, method, description,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.booking_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status)
        .bind(payment.method)
        .bind(&payment.description)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Compare-and-set transition. Fields of `update` that are `Some`
    /// overwrite the stored value; `None` leaves it untouched.
    ///
    /// `Ok(None)` when the row is missing or no longer has status `expected`.
    pub async fn transition(
        &self,
        id: &str,
        expected: PaymentStatus,
        next: PaymentStatus,
        update: &PaymentUpdate,
    ) -> DbResult<Option<Payment>> {
        debug!(id = %id, from = %expected, to = %next, "Transitioning payment");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = ?3,
                gateway_order_id = COALESCE(?4, gateway_order_id),
                gateway_payment_id = COALESCE(?5, gateway_payment_id),
                transaction_id = COALESCE(?6, transaction_id),
                refunded_amount = COALESCE(?7, refunded_amount),
                updated_at = ?8
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(&update.gateway_order_id)
        .bind(&update.gateway_payment_id)
        .bind(&update.transaction_id)
        .bind(update.refunded_amount)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let updated = fetch_payment(&mut *tx, "id", id).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Payments for a booking, oldest first.
    pub async fn list_for_booking(&self, booking_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = ?1 ORDER BY created_at"
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// All payments, newest first.
    pub async fn list(&self) -> DbResult<Vec<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC");
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// Explains why a compare-and-set matched no row.
    async fn stale_or_missing(&self, id: &str, expected: PaymentStatus) -> StoreError {
        match self.get_by_id(id).await {
            Ok(Some(_)) => StoreError::Conflict(ConflictReason::StaleState {
                entity: "payment".to_string(),
                id: id.to_string(),
                expected: expected.to_string(),
            }),
            Ok(None) => StoreError::not_found("Payment", id),
            Err(e) => e.into(),
        }
    }
}

// =============================================================================
// Store Contract
// =============================================================================

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn get_payment(&self, id: &str) -> StoreResult<Payment> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Payment", id))
    }

    async fn payment_by_order_id(&self, gateway_order_id: &str) -> StoreResult<Payment> {
        self.get_by_order_id(gateway_order_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Payment", gateway_order_id))
    }

    async fn payments_for_booking(&self, booking_id: &str) -> StoreResult<Vec<Payment>> {
        Ok(self.list_for_booking(booking_id).await?)
    }

    async fn list_payments(&self) -> StoreResult<Vec<Payment>> {
        Ok(self.list().await?)
    }

    async fn insert_payment(&self, payment: NewPayment) -> StoreResult<Payment> {
        let booking_id = payment.booking_id.clone();
        match self.insert(payment).await {
            Ok(payment) => Ok(payment),
            Err(DbError::ForeignKeyViolation { .. }) => {
                Err(StoreError::not_found("Booking", booking_id))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn attach_order(&self, id: &str, gateway_order_id: &str) -> StoreResult<Payment> {
        debug!(id = %id, gateway_order_id = %gateway_order_id, "Attaching gateway order");

        let result = sqlx::query(
            r#"
            UPDATE payments SET gateway_order_id = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'pending' AND gateway_order_id IS NULL
            "#,
        )
        .bind(id)
        .bind(gateway_order_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(self.stale_or_missing(id, PaymentStatus::Pending).await);
        }

        self.get_payment(id).await
    }

    async fn transition_payment(
        &self,
        id: &str,
        expected: PaymentStatus,
        next: PaymentStatus,
        update: PaymentUpdate,
    ) -> StoreResult<Payment> {
        match self.transition(id, expected, next, &update).await {
            Ok(Some(payment)) => Ok(payment),
            Ok(None) => Err(self.stale_or_missing(id, expected).await),
            Err(e) if e.is_unique_on("payments.booking_id") => {
                let booking_id = self.get_payment(id).await?.booking_id;
                Err(StoreError::Conflict(ConflictReason::DuplicateCompletion {
                    booking_id,
                }))
            }
            Err(other) => Err(other.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::{seed_car, test_db};
    use carlot_core::{Booking, BookingStore, BookingType, NewBooking};

    async fn seed_booking(db: &Database) -> Booking {
        let car = seed_car(db, None, Some(900_000)).await;
        db.bookings()
            .insert_booking(NewBooking {
                customer_id: "cust-1".to_string(),
                car_id: car.id,
                owner_id: "owner-1".to_string(),
                booking_type: BookingType::Purchase,
                total_amount: 900_000,
                start_at: None,
                end_at: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    fn new_payment(booking_id: &str) -> NewPayment {
        NewPayment {
            booking_id: booking_id.to_string(),
            amount: 900_000,
            currency: "INR".to_string(),
            method: PaymentMethod::Gateway,
            description: None,
        }
    }

    fn completion(gateway_payment_id: &str) -> PaymentUpdate {
        PaymentUpdate {
            gateway_payment_id: Some(gateway_payment_id.to_string()),
            transaction_id: Some(gateway_payment_id.to_string()),
            ..PaymentUpdate::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_attach_order() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let repo = db.payments();

        let payment = repo.insert_payment(new_payment(&booking.id)).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.gateway_order_id.is_none());

        let attached = repo.attach_order(&payment.id, "order_1").await.unwrap();
        assert_eq!(attached.gateway_order_id.as_deref(), Some("order_1"));

        let by_order = repo.payment_by_order_id("order_1").await.unwrap();
        assert_eq!(by_order.id, payment.id);

        // Order id is write-once.
        let err = repo.attach_order(&payment.id, "order_2").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict(ConflictReason::StaleState { .. })
        ));
    }

    #[tokio::test]
    async fn test_payment_for_unknown_booking() {
        let db = test_db().await;

        let err = db
            .payments()
            .insert_payment(new_payment("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::not_found("Booking", "ghost"));
    }

    #[tokio::test]
    async fn test_transition_compare_and_set() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let repo = db.payments();
        let payment = repo.insert_payment(new_payment(&booking.id)).await.unwrap();

        let completed = repo
            .transition_payment(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                completion("pay_1"),
            )
            .await
            .unwrap();
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert_eq!(completed.gateway_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(completed.transaction_id.as_deref(), Some("pay_1"));

        let err = repo
            .transition_payment(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                PaymentUpdate::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict(ConflictReason::StaleState { .. })
        ));

        let err = repo
            .transition_payment(
                "nope",
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                PaymentUpdate::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_second_completion_for_booking_rejected() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let repo = db.payments();
        let first = repo.insert_payment(new_payment(&booking.id)).await.unwrap();
        let second = repo.insert_payment(new_payment(&booking.id)).await.unwrap();

        repo.transition_payment(
            &first.id,
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            completion("pay_1"),
        )
        .await
        .unwrap();

        let err = repo
            .transition_payment(
                &second.id,
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                completion("pay_2"),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict(ConflictReason::DuplicateCompletion {
                booking_id: booking.id.clone(),
            })
        );

        // The loser is untouched.
        let second = repo.get_payment(&second.id).await.unwrap();
        assert_eq!(second.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_refund_records_amount() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let repo = db.payments();
        let payment = repo.insert_payment(new_payment(&booking.id)).await.unwrap();
        repo.transition_payment(
            &payment.id,
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            completion("pay_1"),
        )
        .await
        .unwrap();

        let refunded = repo
            .transition_payment(
                &payment.id,
                PaymentStatus::Completed,
                PaymentStatus::Refunded,
                PaymentUpdate {
                    refunded_amount: Some(400_000),
                    ..PaymentUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(refunded.refunded_amount, Some(400_000));
        assert_eq!(refunded.gateway_payment_id.as_deref(), Some("pay_1"));
    }

    #[tokio::test]
    async fn test_settled_payment_blocks_booking_delete() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let payment = db
            .payments()
            .insert_payment(new_payment(&booking.id))
            .await
            .unwrap();
        db.payments()
            .transition_payment(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Completed,
                completion("pay_1"),
            )
            .await
            .unwrap();

        let err = db
            .bookings()
            .delete_booking(&booking.id, carlot_core::BookingStatus::DELETABLE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict(ConflictReason::HasSettledPayment { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsettled_payments_removed_with_booking() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let payment = db
            .payments()
            .insert_payment(new_payment(&booking.id))
            .await
            .unwrap();

        db.bookings()
            .delete_booking(&booking.id, carlot_core::BookingStatus::DELETABLE)
            .await
            .unwrap();

        assert!(db.payments().get_by_id(&payment.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing() {
        let db = test_db().await;
        let booking = seed_booking(&db).await;
        let repo = db.payments();
        repo.insert_payment(new_payment(&booking.id)).await.unwrap();
        repo.insert_payment(new_payment(&booking.id)).await.unwrap();

        assert_eq!(repo.payments_for_booking(&booking.id).await.unwrap().len(), 2);
        assert_eq!(repo.list_payments().await.unwrap().len(), 2);
        assert!(repo.payments_for_booking("other").await.unwrap().is_empty());
    }
}
