//! Payment workflow handlers.
//!
//! Server side of the checkout saga: order creation, callback verification
//! and the confirmation email. Every phase change is persisted on the order
//! document, so a checkout that dies between steps is visible in the store.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use lms_checkout::PaymentCallback;
use lms_models::{CheckoutPhase, CourseId, CourseStatus, Order};

use crate::auth::StudentUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_order_created, record_payment_verified};
use crate::response::{ok, ApiOk};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CapturePaymentRequest {
    pub courses: Vec<String>,
}

#[derive(Serialize)]
pub struct CapturePaymentResponse {
    /// Gateway order id, consumed by the checkout widget
    pub id: String,
    pub amount: u64,
    pub currency: String,
    /// Local order document id
    pub order_ref: String,
}

/// Create a gateway order for the given courses.
pub async fn capture_payment(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    Json(payload): Json<CapturePaymentRequest>,
) -> ApiResult<ApiOk<CapturePaymentResponse>> {
    if payload.courses.is_empty() {
        return Err(ApiError::bad_request("Please provide at least one course id"));
    }

    let course_ids: Vec<CourseId> = payload.courses.into_iter().map(CourseId::from).collect();

    let mut total: u64 = 0;
    for course_id in &course_ids {
        let course = state
            .courses
            .get(course_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Course {} not found", course_id)))?;

        if course.status != CourseStatus::Published {
            return Err(ApiError::bad_request(format!(
                "Course {} is not available for purchase",
                course_id
            )));
        }
        if course.is_enrolled(&user.user_id) {
            return Err(ApiError::conflict(format!(
                "Student is already enrolled in course {}",
                course_id
            )));
        }
        total = total.saturating_add(course.price);
    }

    let gateway_order = state.gateway.create_order(total, "INR").await?;

    let order = Order::new(
        gateway_order.id.clone(),
        user.user_id.clone(),
        course_ids,
        gateway_order.amount,
        gateway_order.currency.clone(),
    );
    state.orders.create(&order).await?;
    record_order_created();

    info!(order = %order.order_id, gateway_order = %gateway_order.id, amount = total,
        "Payment captured, awaiting gateway callback");

    Ok(ok(CapturePaymentResponse {
        id: gateway_order.id,
        amount: gateway_order.amount,
        currency: gateway_order.currency,
        order_ref: order.order_id.0,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyPaymentResponse {
    pub order_ref: String,
    pub phase: String,
    pub enrolled_courses: Vec<String>,
}

/// Verify the gateway callback signature and enroll the purchaser.
pub async fn verify_payment(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> ApiResult<ApiOk<VerifyPaymentResponse>> {
    let mut order = state
        .orders
        .find_by_gateway_order_id(&payload.gateway_order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if order.user != user.user_id {
        return Err(ApiError::forbidden("Order belongs to a different user"));
    }
    if order.phase.is_terminal() {
        return Err(ApiError::conflict(format!(
            "Order already settled in phase {}",
            order.phase
        )));
    }

    // The callback's arrival moves the order out of Created
    if order.phase == CheckoutPhase::Created {
        transition(&state, &mut order, CheckoutPhase::AwaitingGatewayCallback).await?;
    }
    order.payment_id = Some(payload.payment_id.clone());
    transition(&state, &mut order, CheckoutPhase::Verifying).await?;

    let callback = PaymentCallback {
        gateway_order_id: payload.gateway_order_id,
        payment_id: payload.payment_id,
        signature: payload.signature,
    };

    if !state.gateway.verify_callback(&callback) {
        warn!(order = %order.order_id, "Payment signature mismatch");
        fail_order(&state, &mut order, "signature mismatch").await;
        record_payment_verified(false);
        return Err(ApiError::bad_request("Payment verification failed"));
    }

    if let Err(e) = state.enrollment.enroll(&order.user, &order.courses).await {
        error!(order = %order.order_id, error = %e, "Enrollment after verified payment failed");
        fail_order(&state, &mut order, "enrollment failed").await;
        record_payment_verified(false);
        return Err(e);
    }

    transition(&state, &mut order, CheckoutPhase::Verified).await?;
    record_payment_verified(true);
    info!(order = %order.order_id, "Payment verified and enrollment completed");

    Ok(ok(VerifyPaymentResponse {
        order_ref: order.order_id.0.clone(),
        phase: order.phase.as_str().to_string(),
        enrolled_courses: order.courses.iter().map(|c| c.0.clone()).collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SuccessEmailRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct SuccessEmailResponse {
    pub sent_to: String,
}

/// Send the payment confirmation email to the purchaser.
pub async fn send_payment_success_email(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    Json(payload): Json<SuccessEmailRequest>,
) -> ApiResult<ApiOk<SuccessEmailResponse>> {
    let (name, email) = match state.users.get(&user.user_id).await? {
        Some(profile) => (profile.display_name(), profile.email),
        None => (user.email.clone(), user.email.clone()),
    };

    state
        .mailer
        .send_payment_success(
            &email,
            &name,
            payload.amount,
            &payload.gateway_order_id,
            &payload.payment_id,
        )
        .await?;

    Ok(ok(SuccessEmailResponse { sent_to: email }))
}

/// Advance the order and persist the new phase.
async fn transition(state: &AppState, order: &mut Order, next: CheckoutPhase) -> ApiResult<()> {
    order
        .transition(next)
        .map_err(|e| ApiError::conflict(e.to_string()))?;
    state.orders.save_phase(order).await?;
    Ok(())
}

/// Best-effort failure transition; the original error stays the response.
async fn fail_order(state: &AppState, order: &mut Order, reason: &str) {
    if let Err(e) = order.fail(reason) {
        warn!(order = %order.order_id, error = %e, "Could not mark order failed");
        return;
    }
    if let Err(e) = state.orders.save_phase(order).await {
        warn!(order = %order.order_id, error = %e, "Could not persist failed phase");
    }
}
