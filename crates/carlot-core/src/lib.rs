//! # carlot-core: Reservation Rules for Carlot
//!
//! Pure business logic for a car rental/sale marketplace: deciding whether a
//! car is free, what a booking costs, which status changes are legal, and
//! whether a payment confirmation really came from the gateway.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Carlot Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Upstream handlers (HTTP, auth) - not here             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ BookingRequest / PaymentRequest        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        carlot-engine: BookingService, PaymentService            │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │ uses                          │ calls through traits  │
//! │  ┌──────────────▼──────────────────┐  ┌────────▼──────────────────┐   │
//! │  │   ★ carlot-core (THIS CRATE) ★  │  │ carlot-db / HttpGateway   │   │
//! │  │  availability  pricing          │  │ implement store::* and    │   │
//! │  │  lifecycle     signature        │  │ gateway::PaymentGateway   │   │
//! │  │  validation    types, money     │  └───────────────────────────┘   │
//! │  │  NO I/O                         │                                   │
//! │  └─────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Car, Booking, Payment and their status enums
//! - [`money`] - Integer minor-unit money
//! - [`availability`] - Half-open periods and conflict detection
//! - [`pricing`] - Rental and purchase totals
//! - [`lifecycle`] - Booking and payment transition tables
//! - [`signature`] - HMAC-SHA256 confirmation signatures
//! - [`validation`] - Request validation
//! - [`store`] - Persistence traits consumed by the engine
//! - [`gateway`] - Payment gateway trait and receipt format
//! - [`error`] - Error taxonomy

pub mod availability;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod signature;
pub mod store;
pub mod types;
pub mod validation;

pub use availability::{Availability, Period};
pub use error::{
    ConflictReason, CoreError, CoreResult, GatewayError, StoreError, StoreResult, ValidationError,
};
pub use gateway::{GatewayOrder, OrderRequest, PaymentGateway};
pub use money::Money;
pub use signature::{SignatureCheck, SignatureVerifier, TestSignatures};
pub use store::{BookingStore, CarStore, PaymentStore};
pub use types::*;
