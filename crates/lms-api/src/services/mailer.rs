//! Transactional email client.
//!
//! Thin client for the hosted email service's HTTP API. Delivery is
//! best-effort at the call sites; this module only reports the failure.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Mailer configuration.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Email service base URL
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// From address on outgoing mail
    pub from_address: String,
    /// Request timeout
    pub timeout: Duration,
}

impl MailerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("MAILER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8025".to_string()),
            api_key: std::env::var("MAILER_API_KEY").unwrap_or_default(),
            from_address: std::env::var("MAILER_FROM")
                .unwrap_or_else(|_| "no-reply@lms.example.com".to_string()),
            timeout: Duration::from_secs(
                std::env::var("MAILER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

#[derive(Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    body: String,
}

/// Client for the transactional email service.
#[derive(Clone)]
pub struct Mailer {
    http: Client,
    config: MailerConfig,
}

impl Mailer {
    /// Create a new mailer.
    pub fn new(config: MailerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("lms-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Self::new(MailerConfig::from_env())
    }

    /// Send the payment confirmation email.
    pub async fn send_payment_success(
        &self,
        to: &str,
        recipient_name: &str,
        amount: u64,
        gateway_order_id: &str,
        payment_id: &str,
    ) -> ApiResult<()> {
        let url = format!("{}/v1/send", self.config.base_url);
        let request = SendMailRequest {
            from: &self.config.from_address,
            to,
            subject: "Payment received".to_string(),
            body: format!(
                "Hi {},\n\nWe received your payment of {} (order {}, payment {}). \
                 Your courses are now available in your dashboard.\n",
                recipient_name,
                format_amount(amount),
                gateway_order_id,
                payment_id
            ),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::internal(format!("Mailer unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::internal(format!(
                "Mailer returned {}: {}",
                status, body
            )));
        }

        debug!(to = %to, "Payment confirmation email sent");
        Ok(())
    }
}

/// Format a smallest-unit amount as a decimal string.
fn format_amount(amount: u64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(49900), "499.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(100), "1.00");
    }
}
