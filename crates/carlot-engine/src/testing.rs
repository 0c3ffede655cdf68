//! Shared fixtures for service tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use carlot_core::{
    Car, CarStore, GatewayError, GatewayOrder, NewCar, OrderRequest, PaymentGateway,
    SignatureVerifier, TestSignatures,
};
use carlot_db::{Database, DbConfig};

use crate::engine::Engine;
use crate::payment::PaymentSettings;

pub const SECRET: &[u8] = b"carlot-test-secret";
pub const OWNER: &str = "owner-1";
pub const CUSTOMER: &str = "customer-1";

/// Gateway double that records every order it is asked to create.
#[derive(Default)]
pub struct MockGateway {
    requests: Mutex<Vec<OrderRequest>>,
    failure: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn failing(error: GatewayError) -> Self {
        MockGateway {
            requests: Mutex::default(),
            failure: Mutex::new(Some(error)),
        }
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        Ok(GatewayOrder {
            id: format!("order_{}", requests.len()),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        })
    }
}

pub fn settings(test_signatures: TestSignatures) -> PaymentSettings {
    PaymentSettings {
        currency: "INR".to_string(),
        verifier: SignatureVerifier::new(SECRET, test_signatures).unwrap(),
    }
}

pub async fn engine_with(gateway: Arc<MockGateway>, test_signatures: TestSignatures) -> Engine {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    Engine::with_parts(db, gateway, settings(test_signatures))
}

/// Engine over a scratch database file with a multi-connection pool.
/// Returns the file path so the caller can remove it.
pub async fn file_engine(max_connections: u32) -> (Engine, PathBuf) {
    let path = std::env::temp_dir().join(format!("carlot-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(max_connections))
        .await
        .unwrap();
    let engine = Engine::with_parts(
        db,
        Arc::new(MockGateway::default()),
        settings(TestSignatures::Rejected),
    );
    (engine, path)
}

pub fn remove_db_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub async fn engine() -> (Engine, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::default());
    let engine = engine_with(gateway.clone(), TestSignatures::Rejected).await;
    (engine, gateway)
}

pub async fn listed_car(engine: &Engine, daily_rate: Option<i64>, sale_price: Option<i64>) -> Car {
    engine
        .database()
        .cars()
        .insert_car(NewCar {
            owner_id: OWNER.to_string(),
            make: "Maruti".to_string(),
            model: "Swift".to_string(),
            year: 2021,
            daily_rate,
            sale_price,
        })
        .await
        .unwrap()
}

/// `2026-03-01T00:00:00Z` plus `hours`.
pub fn at(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(hours)
}
