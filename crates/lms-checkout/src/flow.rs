//! Checkout flow driver.
//!
//! Sequences the client-driven payment workflow over injectable ports:
//! widget availability, order creation, payment verification and the
//! best-effort confirmation email. Every exit leaves the workflow in a
//! named [`CheckoutPhase`] and returns the resulting cart state instead of
//! mutating anything global.

use tracing::{error, info, warn};

use lms_models::{CheckoutPhase, CourseId};

use crate::cart::{reduce, CartAction, CartState};
use crate::error::CheckoutError;
use crate::gateway::{GatewayOrder, PaymentCallback};

/// Route the user lands on after a verified purchase.
pub const ENROLLED_COURSES_ROUTE: &str = "/dashboard/enrolled-courses";

/// Parameters handed to the hosted checkout widget.
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub key_id: String,
    pub amount: u64,
    pub currency: String,
    pub gateway_order_id: String,
    pub prefill_name: String,
    pub prefill_email: String,
}

/// Result of the user's interaction with the hosted widget.
#[derive(Debug, Clone)]
pub enum WidgetOutcome {
    /// Gateway reported success and delivered a signed callback
    Completed(PaymentCallback),
    /// Payment failed or the user dismissed the widget
    Failed(String),
}

/// Port to the hosted checkout widget.
pub trait GatewayWidget {
    /// Load the widget script; `false` aborts the flow before any order
    /// request is issued.
    fn load(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Open the widget and wait for the user to finish.
    fn open(
        &self,
        options: WidgetOptions,
    ) -> impl std::future::Future<Output = WidgetOutcome> + Send;
}

/// Order-creation payload as received over the wire, validated defensively
/// before the widget is opened.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct OrderPayload {
    pub id: Option<String>,
    pub amount: Option<u64>,
    pub currency: Option<String>,
}

impl OrderPayload {
    /// Check the response shape and produce a usable order.
    pub fn validate(self) -> Result<GatewayOrder, CheckoutError> {
        let id = self
            .id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CheckoutError::InvalidOrderResponse("id".to_string()))?;
        let amount = self
            .amount
            .filter(|a| *a > 0)
            .ok_or_else(|| CheckoutError::InvalidOrderResponse("amount".to_string()))?;
        let currency = self
            .currency
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CheckoutError::InvalidOrderResponse("currency".to_string()))?;

        Ok(GatewayOrder {
            id,
            amount,
            currency,
        })
    }
}

/// Port to the marketplace API.
pub trait CheckoutApi {
    /// `POST /capturePayment`
    fn capture_order(
        &self,
        courses: &[CourseId],
    ) -> impl std::future::Future<Output = Result<OrderPayload, CheckoutError>> + Send;

    /// `POST /verifyPayment`
    fn verify_payment(
        &self,
        callback: &PaymentCallback,
        courses: &[CourseId],
    ) -> impl std::future::Future<Output = Result<(), CheckoutError>> + Send;

    /// `POST /sendPaymentSuccessEmail`
    fn send_success_email(
        &self,
        callback: &PaymentCallback,
        amount: u64,
    ) -> impl std::future::Future<Output = Result<(), CheckoutError>> + Send;
}

/// Final state of one checkout attempt.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub phase: CheckoutPhase,
    pub cart: CartState,
    /// Destination after a verified purchase, `None` otherwise
    pub navigate_to: Option<String>,
    /// User-facing failure text, `None` on success
    pub error: Option<String>,
}

/// Identity shown in the widget's prefill fields.
#[derive(Debug, Clone)]
pub struct Purchaser {
    pub name: String,
    pub email: String,
}

/// Drives the checkout workflow.
pub struct CheckoutFlow<A, W> {
    api: A,
    widget: W,
    gateway_key_id: String,
}

impl<A: CheckoutApi, W: GatewayWidget> CheckoutFlow<A, W> {
    pub fn new(api: A, widget: W, gateway_key_id: impl Into<String>) -> Self {
        Self {
            api,
            widget,
            gateway_key_id: gateway_key_id.into(),
        }
    }

    /// Purchase every course in the cart.
    ///
    /// The cart is only cleared after the payment verifies; any earlier
    /// failure returns it untouched with the phase that was reached.
    pub async fn buy_courses(&self, cart: CartState, purchaser: Purchaser) -> CheckoutOutcome {
        let mut cart = reduce(cart, CartAction::SetPaymentLoading(true));
        let courses = cart.course_ids();

        let outcome = self.run(&courses, &cart, &purchaser).await;

        cart = reduce(cart, CartAction::SetPaymentLoading(false));
        match outcome {
            Ok(()) => CheckoutOutcome {
                phase: CheckoutPhase::Verified,
                cart: reduce(cart, CartAction::Reset),
                navigate_to: Some(ENROLLED_COURSES_ROUTE.to_string()),
                error: None,
            },
            Err((phase, e)) => CheckoutOutcome {
                phase,
                cart,
                navigate_to: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn run(
        &self,
        courses: &[CourseId],
        cart: &CartState,
        purchaser: &Purchaser,
    ) -> Result<(), (CheckoutPhase, CheckoutError)> {
        // Widget first: a script that never loads must not create orders
        if !self.widget.load().await {
            error!("Checkout widget failed to load");
            return Err((CheckoutPhase::Failed, CheckoutError::WidgetLoad));
        }

        let order = self
            .api
            .capture_order(courses)
            .await
            .and_then(OrderPayload::validate)
            .map_err(|e| {
                error!("Order creation failed: {}", e);
                (CheckoutPhase::Failed, e)
            })?;

        if order.amount != cart.total() {
            warn!(
                ordered = order.amount,
                cart_total = cart.total(),
                "Gateway order amount differs from cart total"
            );
        }

        info!(order_id = %order.id, "Opening checkout widget");
        let options = WidgetOptions {
            key_id: self.gateway_key_id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            gateway_order_id: order.id.clone(),
            prefill_name: purchaser.name.clone(),
            prefill_email: purchaser.email.clone(),
        };

        let callback = match self.widget.open(options).await {
            WidgetOutcome::Completed(callback) => callback,
            WidgetOutcome::Failed(reason) => {
                error!("Payment failed in widget: {}", reason);
                return Err((
                    CheckoutPhase::Failed,
                    CheckoutError::Verification(reason),
                ));
            }
        };

        // Best-effort: a lost email never fails the purchase
        if let Err(e) = self.api.send_success_email(&callback, order.amount).await {
            warn!("Payment success email failed: {}", e);
        }

        self.api
            .verify_payment(&callback, courses)
            .await
            .map_err(|e| {
                error!("Payment verification failed: {}", e);
                (CheckoutPhase::Failed, e)
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingApi {
        captures: AtomicUsize,
        verifies: AtomicUsize,
        emails: AtomicUsize,
        order: Mutex<Option<OrderPayload>>,
        verify_ok: bool,
        email_ok: bool,
    }

    impl RecordingApi {
        fn with_order(order: OrderPayload, verify_ok: bool) -> Self {
            Self {
                order: Mutex::new(Some(order)),
                verify_ok,
                email_ok: true,
                ..Default::default()
            }
        }
    }

    impl CheckoutApi for &RecordingApi {
        async fn capture_order(&self, _courses: &[CourseId]) -> Result<OrderPayload, CheckoutError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            self.order
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| CheckoutError::OrderCreation("no order configured".to_string()))
        }

        async fn verify_payment(
            &self,
            _callback: &PaymentCallback,
            _courses: &[CourseId],
        ) -> Result<(), CheckoutError> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            if self.verify_ok {
                Ok(())
            } else {
                Err(CheckoutError::Verification("signature mismatch".to_string()))
            }
        }

        async fn send_success_email(
            &self,
            _callback: &PaymentCallback,
            _amount: u64,
        ) -> Result<(), CheckoutError> {
            self.emails.fetch_add(1, Ordering::SeqCst);
            if self.email_ok {
                Ok(())
            } else {
                Err(CheckoutError::Email("smtp down".to_string()))
            }
        }
    }

    struct FakeWidget {
        loads: bool,
        outcome: WidgetOutcome,
    }

    impl GatewayWidget for &FakeWidget {
        async fn load(&self) -> bool {
            self.loads
        }

        async fn open(&self, _options: WidgetOptions) -> WidgetOutcome {
            self.outcome.clone()
        }
    }

    fn cart_with_one_course() -> CartState {
        reduce(
            CartState::default(),
            CartAction::AddCourse(CartItem {
                course_id: CourseId::from("c1"),
                course_name: "Course c1".to_string(),
                price: 49900,
            }),
        )
    }

    fn purchaser() -> Purchaser {
        Purchaser {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn good_order() -> OrderPayload {
        OrderPayload {
            id: Some("order_1".to_string()),
            amount: Some(49900),
            currency: Some("INR".to_string()),
        }
    }

    fn completed_callback() -> WidgetOutcome {
        WidgetOutcome::Completed(PaymentCallback {
            gateway_order_id: "order_1".to_string(),
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
        })
    }

    #[tokio::test]
    async fn widget_load_failure_issues_no_order_request() {
        let api = RecordingApi::with_order(good_order(), true);
        let widget = FakeWidget {
            loads: false,
            outcome: completed_callback(),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(api.captures.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.phase, CheckoutPhase::Failed);
        assert!(!outcome.cart.is_empty());
        assert!(outcome.navigate_to.is_none());
    }

    #[tokio::test]
    async fn verify_failure_keeps_cart_and_stays_put() {
        let api = RecordingApi::with_order(good_order(), false);
        let widget = FakeWidget {
            loads: true,
            outcome: completed_callback(),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(api.verifies.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.phase, CheckoutPhase::Failed);
        assert!(!outcome.cart.is_empty());
        assert!(outcome.navigate_to.is_none());
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn verified_payment_clears_cart_and_navigates() {
        let api = RecordingApi::with_order(good_order(), true);
        let widget = FakeWidget {
            loads: true,
            outcome: completed_callback(),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(outcome.phase, CheckoutPhase::Verified);
        assert!(outcome.cart.is_empty());
        assert!(!outcome.cart.payment_loading);
        assert_eq!(outcome.navigate_to.as_deref(), Some(ENROLLED_COURSES_ROUTE));
        assert_eq!(api.emails.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_purchase() {
        let mut api = RecordingApi::with_order(good_order(), true);
        api.email_ok = false;
        let widget = FakeWidget {
            loads: true,
            outcome: completed_callback(),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(outcome.phase, CheckoutPhase::Verified);
        assert_eq!(api.verifies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_order_response_aborts_before_widget() {
        let api = RecordingApi::with_order(
            OrderPayload {
                id: Some("order_1".to_string()),
                amount: None,
                currency: Some("INR".to_string()),
            },
            true,
        );
        let widget = FakeWidget {
            loads: true,
            outcome: completed_callback(),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(outcome.phase, CheckoutPhase::Failed);
        assert_eq!(api.verifies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn widget_dismissal_fails_after_order_creation() {
        let api = RecordingApi::with_order(good_order(), true);
        let widget = FakeWidget {
            loads: true,
            outcome: WidgetOutcome::Failed("payment.failed".to_string()),
        };
        let flow = CheckoutFlow::new(&api, &widget, "key_test");

        let outcome = flow.buy_courses(cart_with_one_course(), purchaser()).await;

        assert_eq!(api.captures.load(Ordering::SeqCst), 1);
        assert_eq!(api.verifies.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.phase, CheckoutPhase::Failed);
        assert!(!outcome.cart.is_empty());
    }
}
