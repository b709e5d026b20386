//! Checkout workflow error types.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors surfaced by the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Checkout widget failed to load")]
    WidgetLoad,

    #[error("Order creation failed: {0}")]
    OrderCreation(String),

    #[error("Order response is missing required fields: {0}")]
    InvalidOrderResponse(String),

    #[error("Payment verification failed: {0}")]
    Verification(String),

    #[error("Confirmation email failed: {0}")]
    Email(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
