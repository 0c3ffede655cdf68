//! # Car Repository
//!
//! Car listings. Cars are read-mostly here: the engine only needs the owner,
//! the prices and the availability flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use carlot_core::{Car, CarStore, NewCar, StoreError, StoreResult};

const CAR_COLUMNS: &str = "id, owner_id, make, model, year, daily_rate, sale_price, \
                           is_available, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CarRow {
    id: String,
    owner_id: String,
    make: String,
    model: String,
    year: i32,
    daily_rate: Option<i64>,
    sale_price: Option<i64>,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CarRow> for Car {
    fn from(row: CarRow) -> Self {
        Car {
            id: row.id,
            owner_id: row.owner_id,
            make: row.make,
            model: row.model,
            year: row.year,
            daily_rate: row.daily_rate,
            sale_price: row.sale_price,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for car database operations.
#[derive(Debug, Clone)]
pub struct CarRepository {
    pool: SqlitePool,
}

impl CarRepository {
    /// Creates a new CarRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CarRepository { pool }
    }

    /// Gets a car by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Car>> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = ?1");
        let row: Option<CarRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Car::from))
    }

    /// Inserts a new car listing, available by default.
    pub async fn insert(&self, car: NewCar) -> DbResult<Car> {
        let now = Utc::now();
        let car = Car {
            id: Uuid::new_v4().to_string(),
            owner_id: car.owner_id,
            make: car.make,
            model: car.model,
            year: car.year,
            daily_rate: car.daily_rate,
            sale_price: car.sale_price,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %car.id, owner_id = %car.owner_id, "Inserting car");

        sqlx::query(
            r#"
            INSERT INTO cars (
                id, owner_id, make, model, year,
                daily_rate, sale_price, is_available,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&car.id)
        .bind(&car.owner_id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.daily_rate)
        .bind(car.sale_price)
        .bind(car.is_available)
        .bind(car.created_at)
        .bind(car.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(car)
    }

    /// Lists or unlists a car.
    pub async fn set_available(&self, id: &str, available: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE cars SET is_available = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(available)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Car", id));
        }

        Ok(())
    }

    /// Lists all cars, newest first.
    pub async fn list(&self) -> DbResult<Vec<Car>> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars ORDER BY created_at DESC");
        let rows: Vec<CarRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Car::from).collect())
    }

    /// Counts all cars.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cars")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl CarStore for CarRepository {
    async fn insert_car(&self, car: NewCar) -> StoreResult<Car> {
        Ok(self.insert(car).await?)
    }

    async fn get_car(&self, id: &str) -> StoreResult<Car> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Car", id))
    }

    async fn list_cars(&self) -> StoreResult<Vec<Car>> {
        Ok(self.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_car, test_db};

    #[tokio::test]
    async fn test_insert_and_get_car() {
        let db = test_db().await;
        let car = seed_car(&db, Some(5000), None).await;

        let fetched = db.cars().get_car(&car.id).await.unwrap();
        assert_eq!(fetched.owner_id, "owner-1");
        assert_eq!(fetched.daily_rate, Some(5000));
        assert_eq!(fetched.sale_price, None);
        assert!(fetched.is_available);
    }

    #[tokio::test]
    async fn test_missing_car_is_not_found() {
        let db = test_db().await;

        let err = db.cars().get_car("nope").await.unwrap_err();
        assert_eq!(err, StoreError::not_found("Car", "nope"));
    }

    #[tokio::test]
    async fn test_set_available() {
        let db = test_db().await;
        let car = seed_car(&db, Some(5000), None).await;

        db.cars().set_available(&car.id, false).await.unwrap();
        assert!(!db.cars().get_car(&car.id).await.unwrap().is_available);

        assert!(matches!(
            db.cars().set_available("nope", true).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected_by_schema() {
        let db = test_db().await;
        let result = db
            .cars()
            .insert(NewCar {
                owner_id: "owner-1".to_string(),
                make: "Fiat".to_string(),
                model: "Panda".to_string(),
                year: 2015,
                daily_rate: Some(0),
                sale_price: None,
            })
            .await;

        assert!(matches!(result, Err(DbError::CheckViolation(_))));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let db = test_db().await;
        seed_car(&db, Some(5000), None).await;
        seed_car(&db, None, Some(900_000)).await;

        assert_eq!(db.cars().count().await.unwrap(), 2);
        assert_eq!(db.cars().list_cars().await.unwrap().len(), 2);
    }
}
