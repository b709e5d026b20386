//! Checkout workflow for the LMS marketplace.
//!
//! This crate models the browser-driven payment flow as typed state:
//! - [`cart`]: cart contents and payment-loading flag with a pure reducer
//! - [`gateway`]: payment-gateway REST client and callback signature checks
//! - [`flow`]: the driver sequencing widget load, order creation, payment
//!   verification and the best-effort confirmation email
//!
//! The saga phases themselves live in [`lms_models::order`] so the API
//! server persists the same machine this crate drives.

pub mod cart;
pub mod error;
pub mod flow;
pub mod gateway;

pub use cart::{CartAction, CartItem, CartState};
pub use error::CheckoutError;
pub use flow::{
    CheckoutApi, CheckoutFlow, CheckoutOutcome, GatewayWidget, OrderPayload, Purchaser,
    WidgetOptions, WidgetOutcome, ENROLLED_COURSES_ROUTE,
};
pub use gateway::{GatewayClient, GatewayConfig, GatewayError, GatewayOrder, PaymentCallback};
