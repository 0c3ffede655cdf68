//! # Payment Gateway Interface
//!
//! The order-creation seam towards the external gateway, plus the receipt
//! format the gateway accepts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Gateway limit on the receipt field.
pub const MAX_RECEIPT_LEN: usize = 40;

/// Characters of the booking id kept in a receipt.
const RECEIPT_BOOKING_CHARS: usize = 8;

/// Body of a create-order call. `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

/// Order as acknowledged by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote order and returns its id.
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError>;
}

/// Builds a receipt: `rcpt_<booking id prefix>_<millis base36>`, capped at
/// [`MAX_RECEIPT_LEN`].
pub fn build_receipt(booking_id: &str, now: DateTime<Utc>) -> String {
    let short: String = booking_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(RECEIPT_BOOKING_CHARS)
        .collect();

    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let mut receipt = format!("rcpt_{}_{}", short, to_base36(millis));
    receipt.truncate(MAX_RECEIPT_LEN);
    receipt
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
