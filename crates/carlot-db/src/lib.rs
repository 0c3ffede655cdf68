//! # carlot-db: SQLite Store for Carlot
//!
//! Implements the carlot-core store traits ([`CarStore`], [`BookingStore`],
//! [`PaymentStore`]) on SQLite via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carlot-engine (BookingService / PaymentService)                       │
//! │       │  Arc<dyn BookingStore> ...                                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     carlot-db (THIS CRATE)                      │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │◄───│ CarRepo       │    │  (embedded)  │   │   │
//! │  │   │  SqlitePool   │    │ BookingRepo   │    │ 001_init.sql │   │   │
//! │  │   │               │    │ PaymentRepo   │    │              │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (overlap triggers, settled-payment unique index)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carlot_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./carlot.db")).await?;
//! let booking = db.bookings().get_booking("b-1").await?;
//! ```
//!
//! [`CarStore`]: carlot_core::CarStore
//! [`BookingStore`]: carlot_core::BookingStore
//! [`PaymentStore`]: carlot_core::PaymentStore

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::booking::{Admission, BookingRepository};
pub use repository::car::CarRepository;
pub use repository::payment::PaymentRepository;
