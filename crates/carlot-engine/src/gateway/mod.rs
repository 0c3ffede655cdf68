//! # Gateway Clients
//!
//! Concrete [`PaymentGateway`](carlot_core::PaymentGateway) implementations.
//!
//! - [`HttpGateway`] - REST order creation over `reqwest`

pub mod http;

pub use http::HttpGateway;
