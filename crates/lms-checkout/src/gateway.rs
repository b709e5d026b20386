//! Payment-gateway REST client.
//!
//! Talks to the hosted gateway's order API and verifies the HMAC-SHA256
//! signature the gateway attaches to its success callback.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Errors from the gateway client.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway credentials missing: {0}")]
    Credentials(String),

    #[error("Gateway request failed ({0}): {1}")]
    RequestFailed(u16, String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Gateway client configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Public key id, also handed to the browser widget
    pub key_id: String,
    /// Secret used for basic auth and callback signatures
    pub key_secret: String,
    /// Gateway API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        let key_id = std::env::var("GATEWAY_KEY_ID")
            .map_err(|_| GatewayError::Credentials("GATEWAY_KEY_ID must be set".to_string()))?;
        let key_secret = std::env::var("GATEWAY_KEY_SECRET")
            .map_err(|_| GatewayError::Credentials("GATEWAY_KEY_SECRET must be set".to_string()))?;

        Ok(Self {
            key_id,
            key_secret,
            base_url: std::env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            timeout: Duration::from_secs(
                std::env::var("GATEWAY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
        })
    }
}

/// Order created on the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id, referenced by the widget and the callback
    pub id: String,
    /// Amount in the smallest currency unit
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
}

/// Success callback delivered by the hosted widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub payment_id: String,
    /// hex(HMAC-SHA256(secret, order_id + "|" + payment_id))
    pub signature: String,
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    receipt: String,
}

/// Client for the payment gateway's REST API.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lms-checkout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GatewayError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(GatewayConfig::from_env()?)
    }

    /// Public key id for the browser widget.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create an order on the gateway.
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/v1/orders", self.config.base_url);
        let request = CreateOrderRequest {
            amount,
            currency,
            receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
        };

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Gateway order creation failed");
            return Err(GatewayError::RequestFailed(status.as_u16(), body));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        debug!(order_id = %order.id, amount = order.amount, "Created gateway order");
        Ok(order)
    }

    /// Verify the signature of a success callback.
    ///
    /// The gateway signs `order_id|payment_id` with the shared secret; the
    /// comparison runs over MAC bytes, not strings, so it is constant-time.
    pub fn verify_callback(&self, callback: &PaymentCallback) -> bool {
        verify_signature(
            &self.config.key_secret,
            &callback.gateway_order_id,
            &callback.payment_id,
            &callback.signature,
        )
    }
}

/// Compute the callback signature for an (order, payment) pair.
pub fn sign(secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    use std::fmt::Write;

    let bytes = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(hex, "{:02x}", b);
    }
    hex
}

/// Check a hex signature against the expected MAC.
pub fn verify_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let Some(sig_bytes) = decode_hex(signature) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    mac.verify_slice(&sig_bytes).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";

    #[test]
    fn signature_round_trips() {
        let signature = sign(SECRET, "order_1", "pay_1");
        assert!(verify_signature(SECRET, "order_1", "pay_1", &signature));
    }

    #[test]
    fn altered_ids_fail_verification() {
        let signature = sign(SECRET, "order_1", "pay_1");
        assert!(!verify_signature(SECRET, "order_2", "pay_1", &signature));
        assert!(!verify_signature(SECRET, "order_1", "pay_2", &signature));
        assert!(!verify_signature("other_secret", "order_1", "pay_1", &signature));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        assert!(!verify_signature(SECRET, "order_1", "pay_1", "zz"));
        assert!(!verify_signature(SECRET, "order_1", "pay_1", "abc"));
        assert!(!verify_signature(SECRET, "order_1", "pay_1", ""));
    }

    #[test]
    fn decode_hex_handles_edge_cases() {
        assert_eq!(decode_hex("00ff"), Some(vec![0x00, 0xff]));
        assert_eq!(decode_hex("0"), None);
        assert_eq!(decode_hex("gg"), None);
    }
}
