//! # carlot-engine: Reservation Admission & Payment Reconciliation
//!
//! Applies the carlot-core rules to persisted bookings and payments.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Upstream handlers (HTTP, auth, notifications) - not here               │
//! │       │ BookingRequest / PaymentRequest / gateway callbacks             │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  carlot-engine (THIS CRATE)                     │   │
//! │  │   Engine ──► BookingService      PaymentService                 │   │
//! │  │              admission            create / verify / refund      │   │
//! │  │              transitions, delete                                │   │
//! │  │   EngineConfig (TOML + CARLOT_* env)    HttpGateway (reqwest)   │   │
//! │  └────────┬───────────────────────────────────────┬───────────────┘   │
//! │           │ Arc<dyn *Store>                        │ Arc<dyn PaymentGateway>
//! │           ▼                                        ▼                   │
//! │     carlot-db (SQLite)                   Razorpay-compatible API       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carlot_engine::{Engine, EngineConfig};
//!
//! let config = EngineConfig::load(Some(Path::new("carlot.toml")))?;
//! let engine = Engine::open(&config).await?;
//!
//! let booking = engine.bookings().create_booking(request).await?;
//! let payment = engine.payments().create_payment(payment_request).await?;
//! ```

pub mod booking;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod payment;

#[cfg(test)]
mod testing;

pub use booking::BookingService;
pub use config::{DatabaseSettings, EngineConfig, GatewaySettings, PaymentPolicy};
pub use engine::Engine;
pub use error::{ConfigError, ConfigResult};
pub use gateway::HttpGateway;
pub use payment::{PaymentService, PaymentSettings};
