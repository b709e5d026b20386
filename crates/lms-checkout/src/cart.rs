//! Cart state and reducer.
//!
//! The cart and the payment-loading flag are explicit state passed through
//! pure transition functions; nothing here is global or mutable in place.

use serde::{Deserialize, Serialize};

use lms_models::CourseId;

/// A course placed in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub course_id: CourseId,
    pub course_name: String,
    /// Price in the smallest currency unit
    pub price: u64,
}

/// Cart contents plus the payment-in-flight flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub payment_loading: bool,
}

impl CartState {
    /// Total price of everything in the cart.
    pub fn total(&self) -> u64 {
        self.items.iter().map(|i| i.price).sum()
    }

    /// Course ids in the cart, in insertion order.
    pub fn course_ids(&self) -> Vec<CourseId> {
        self.items.iter().map(|i| i.course_id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add a course; adding one already present is a no-op.
    AddCourse(CartItem),
    /// Remove a course by id.
    RemoveCourse(CourseId),
    /// Empty the cart after a verified purchase.
    Reset,
    /// Toggle the payment-in-flight flag.
    SetPaymentLoading(bool),
}

/// Pure cart transition function.
pub fn reduce(state: CartState, action: CartAction) -> CartState {
    let mut next = state;
    match action {
        CartAction::AddCourse(item) => {
            if !next.items.iter().any(|i| i.course_id == item.course_id) {
                next.items.push(item);
            }
        }
        CartAction::RemoveCourse(course_id) => {
            next.items.retain(|i| i.course_id != course_id);
        }
        CartAction::Reset => {
            next.items.clear();
        }
        CartAction::SetPaymentLoading(loading) => {
            next.payment_loading = loading;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: u64) -> CartItem {
        CartItem {
            course_id: CourseId::from(id),
            course_name: format!("Course {}", id),
            price,
        }
    }

    #[test]
    fn add_is_idempotent_per_course() {
        let state = reduce(CartState::default(), CartAction::AddCourse(item("c1", 100)));
        let state = reduce(state, CartAction::AddCourse(item("c1", 100)));
        assert_eq!(state.items.len(), 1);
    }

    #[test]
    fn total_sums_prices() {
        let state = reduce(CartState::default(), CartAction::AddCourse(item("c1", 100)));
        let state = reduce(state, CartAction::AddCourse(item("c2", 250)));
        assert_eq!(state.total(), 350);
    }

    #[test]
    fn remove_only_targets_named_course() {
        let state = reduce(CartState::default(), CartAction::AddCourse(item("c1", 100)));
        let state = reduce(state, CartAction::AddCourse(item("c2", 250)));
        let state = reduce(state, CartAction::RemoveCourse(CourseId::from("c1")));
        assert_eq!(state.course_ids(), vec![CourseId::from("c2")]);
    }

    #[test]
    fn reset_clears_items_but_not_loading_flag() {
        let state = reduce(CartState::default(), CartAction::AddCourse(item("c1", 100)));
        let state = reduce(state, CartAction::SetPaymentLoading(true));
        let state = reduce(state, CartAction::Reset);
        assert!(state.is_empty());
        assert!(state.payment_loading);
    }

    #[test]
    fn reducer_does_not_mutate_input() {
        let original = reduce(CartState::default(), CartAction::AddCourse(item("c1", 100)));
        let snapshot = original.clone();
        let _next = reduce(original.clone(), CartAction::Reset);
        assert_eq!(original, snapshot);
    }
}
