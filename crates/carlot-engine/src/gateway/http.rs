//! # HTTP Gateway Client
//!
//! Creates orders on a Razorpay-compatible REST API.
//!
//! ```text
//! POST {base_url}/orders
//! Authorization: Basic base64(key_id:key_secret)
//! { "amount": 150000, "currency": "INR", "receipt": "rcpt_1a2b3c4d_lx2k9q1" }
//!
//! 200 { "id": "order_Mz...", "amount": 150000, "currency": "INR", ... }
//! ```
//!
//! A timeout is reported as [`GatewayError::Timeout`]; it never looks like a
//! created order.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use carlot_core::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

use crate::config::GatewaySettings;
use crate::error::{ConfigError, ConfigResult};

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

/// `reqwest`-backed gateway client.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    orders_url: String,
    key_id: String,
    key_secret: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("orders_url", &self.orders_url)
            .field("key_id", &self.key_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Builds a client with the configured per-request timeout.
    pub fn new(settings: &GatewaySettings) -> ConfigResult<Self> {
        let timeout = settings.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Gateway(e.to_string()))?;

        Ok(HttpGateway {
            client,
            orders_url: orders_url(&settings.base_url),
            key_id: settings.key_id.clone(),
            key_secret: settings.key_secret.clone(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout {
                after_secs: self.timeout.as_secs(),
            }
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

fn clip(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

fn orders_url(base_url: &str) -> String {
    format!("{}/orders", base_url.trim_end_matches('/'))
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        debug!(
            amount = request.amount,
            currency = %request.currency,
            receipt = %request.receipt,
            "Creating gateway order"
        );

        let response = self
            .client
            .post(&self.orders_url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = clip(response.text().await.unwrap_or_default());
            warn!(status = status.as_u16(), "Gateway rejected order");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if order.id.is_empty() {
            return Err(GatewayError::InvalidResponse("order id missing".into()));
        }

        debug!(order_id = %order.id, "Gateway order created");
        Ok(order)
    }
}
