//! Shared data models for the LMS backend.
//!
//! This crate provides Serde-serializable types for:
//! - Courses and their embedded curriculum (sections/subsections)
//! - Ratings and reviews
//! - Categories
//! - User profiles and roles
//! - Orders and the checkout phase machine

pub mod category;
pub mod course;
pub mod ids;
pub mod order;
pub mod review;
pub mod user;

// Re-export common types
pub use category::Category;
pub use course::{Course, CourseStatus, Section, SubSection};
pub use ids::{CategoryId, CourseId, OrderId, ReviewId, SectionId, SubSectionId, UserId};
pub use order::{CheckoutPhase, Order, PhaseTransitionError};
pub use review::{Rating, RatingAndReview, RatingError};
pub use user::{CourseProgress, UserProfile, UserRole};
