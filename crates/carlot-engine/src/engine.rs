//! # Engine Assembly
//!
//! Wires the SQLite store and the HTTP gateway into the two services.
//!
//! ```text
//! EngineConfig ──► Database::new(db_config)  ──► CarRepository ─────┐
//!              │                              ──► BookingRepository ─┼─► BookingService
//!              │                              ──► PaymentRepository ─┼─► PaymentService
//!              ├─► HttpGateway::new(gateway) ────────────────────────┤
//!              └─► payment_settings() ───────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::info;

use carlot_core::PaymentGateway;
use carlot_db::Database;

use crate::booking::BookingService;
use crate::config::EngineConfig;
use crate::error::ConfigResult;
use crate::gateway::HttpGateway;
use crate::payment::{PaymentService, PaymentSettings};

/// Both services over one shared database.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    bookings: BookingService,
    payments: PaymentService,
}

impl Engine {
    /// Opens the database (running migrations) and builds the gateway client.
    pub async fn open(config: &EngineConfig) -> ConfigResult<Self> {
        config.validate()?;

        let settings = config.payment_settings()?;
        let gateway = HttpGateway::new(&config.gateway)?;
        let db = Database::new(config.db_config()).await?;

        info!(
            database = %config.database.path.display(),
            currency = %settings.currency,
            "Engine ready"
        );

        Ok(Self::with_parts(db, Arc::new(gateway), settings))
    }

    /// Builds the services over an open database and any gateway.
    pub fn with_parts(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        settings: PaymentSettings,
    ) -> Self {
        let cars = Arc::new(db.cars());
        let bookings = Arc::new(db.bookings());
        let payments = Arc::new(db.payments());

        Engine {
            bookings: BookingService::new(cars, bookings.clone()),
            payments: PaymentService::new(bookings, payments, gateway, settings),
            db,
        }
    }

    pub fn bookings(&self) -> &BookingService {
        &self.bookings
    }

    pub fn payments(&self) -> &PaymentService {
        &self.payments
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
