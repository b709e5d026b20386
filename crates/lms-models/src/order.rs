//! Order model and checkout phase machine.
//!
//! Every step of the payment workflow lands the persisted order in an
//! observable phase, so a partially completed checkout can be inspected and
//! resumed instead of existing only in client logs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{CourseId, OrderId, UserId};

/// Checkout workflow phase.
///
/// Legal transitions:
///
/// ```text
/// Created ──► AwaitingGatewayCallback ──► Verifying ──► Verified
///                        │                    │
///                        └────────► Failed ◄──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// Gateway order created, widget not yet opened
    #[default]
    Created,
    /// Hosted widget opened, waiting for the gateway callback
    AwaitingGatewayCallback,
    /// Callback received, signature verification in flight
    Verifying,
    /// Payment verified and enrollment completed
    Verified,
    /// Workflow ended without a verified payment
    Failed,
}

impl CheckoutPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Created => "created",
            CheckoutPhase::AwaitingGatewayCallback => "awaiting_gateway_callback",
            CheckoutPhase::Verifying => "verifying",
            CheckoutPhase::Verified => "verified",
            CheckoutPhase::Failed => "failed",
        }
    }

    /// Parse from a stored string, `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(CheckoutPhase::Created),
            "awaiting_gateway_callback" => Some(CheckoutPhase::AwaitingGatewayCallback),
            "verifying" => Some(CheckoutPhase::Verifying),
            "verified" => Some(CheckoutPhase::Verified),
            "failed" => Some(CheckoutPhase::Failed),
            _ => None,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: CheckoutPhase) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, next),
            (Created, AwaitingGatewayCallback)
                | (AwaitingGatewayCallback, Verifying)
                | (AwaitingGatewayCallback, Failed)
                | (Verifying, Verified)
                | (Verifying, Failed)
        )
    }

    /// Terminal phases accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Verified | CheckoutPhase::Failed)
    }
}

impl fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected checkout phase transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal checkout transition: {from} -> {to}")]
pub struct PhaseTransitionError {
    pub from: CheckoutPhase,
    pub to: CheckoutPhase,
}

/// Persisted order document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Local order document id
    pub order_id: OrderId,

    /// Gateway-side order id
    pub gateway_order_id: String,

    /// Purchasing user
    pub user: UserId,

    /// Courses being purchased
    pub courses: Vec<CourseId>,

    /// Total amount in the smallest currency unit
    pub amount: u64,

    /// ISO currency code
    pub currency: String,

    #[serde(default)]
    pub phase: CheckoutPhase,

    /// Gateway payment id, known once the callback arrives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,

    /// Reason recorded when the workflow fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an order in the initial phase.
    pub fn new(
        gateway_order_id: impl Into<String>,
        user: UserId,
        courses: Vec<CourseId>,
        amount: u64,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_id: OrderId::new(),
            gateway_order_id: gateway_order_id.into(),
            user,
            courses,
            amount,
            currency: currency.into(),
            phase: CheckoutPhase::Created,
            payment_id: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the order to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: CheckoutPhase) -> Result<(), PhaseTransitionError> {
        if !self.phase.can_transition_to(next) {
            return Err(PhaseTransitionError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mark the order failed with a reason. Legal from any non-terminal phase
    /// that allows it; a failure in `Created` is treated as an aborted flow.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), PhaseTransitionError> {
        // A widget that never opens leaves the order in Created; record the
        // abort by passing through AwaitingGatewayCallback.
        if self.phase == CheckoutPhase::Created {
            self.transition(CheckoutPhase::AwaitingGatewayCallback)?;
        }
        self.transition(CheckoutPhase::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            "order_G1",
            UserId::from("u1"),
            vec![CourseId::from("c1"), CourseId::from("c2")],
            99800,
            "INR",
        )
    }

    #[test]
    fn happy_path_transitions() {
        let mut order = sample_order();
        assert_eq!(order.phase, CheckoutPhase::Created);
        order.transition(CheckoutPhase::AwaitingGatewayCallback).unwrap();
        order.transition(CheckoutPhase::Verifying).unwrap();
        order.transition(CheckoutPhase::Verified).unwrap();
        assert!(order.phase.is_terminal());
    }

    #[test]
    fn skipping_verification_is_rejected() {
        let mut order = sample_order();
        order.transition(CheckoutPhase::AwaitingGatewayCallback).unwrap();
        let err = order.transition(CheckoutPhase::Verified).unwrap_err();
        assert_eq!(err.from, CheckoutPhase::AwaitingGatewayCallback);
        assert_eq!(err.to, CheckoutPhase::Verified);
        // Phase unchanged after a rejected transition
        assert_eq!(order.phase, CheckoutPhase::AwaitingGatewayCallback);
    }

    #[test]
    fn terminal_phases_are_final() {
        let mut order = sample_order();
        order.transition(CheckoutPhase::AwaitingGatewayCallback).unwrap();
        order.transition(CheckoutPhase::Verifying).unwrap();
        order.transition(CheckoutPhase::Failed).unwrap();
        assert!(order.transition(CheckoutPhase::Verifying).is_err());
        assert!(order.transition(CheckoutPhase::Verified).is_err());
    }

    #[test]
    fn fail_from_created_records_reason() {
        let mut order = sample_order();
        order.fail("widget failed to load").unwrap();
        assert_eq!(order.phase, CheckoutPhase::Failed);
        assert_eq!(order.failure_reason.as_deref(), Some("widget failed to load"));
    }

    #[test]
    fn phase_string_round_trip() {
        for phase in [
            CheckoutPhase::Created,
            CheckoutPhase::AwaitingGatewayCallback,
            CheckoutPhase::Verifying,
            CheckoutPhase::Verified,
            CheckoutPhase::Failed,
        ] {
            assert_eq!(CheckoutPhase::from_str(phase.as_str()), Some(phase));
        }
        assert_eq!(CheckoutPhase::from_str("pending"), None);
    }
}
