//! Firestore REST document-store client for the LMS backend.
//!
//! This crate provides:
//! - Typed repositories for courses, reviews, users, categories and orders
//! - Service account authentication via gcp_auth with token caching
//! - Structured queries, server-side aggregation, batch get/write
//! - Retry with exponential backoff and jitter

pub mod category_repo;
pub mod client;
pub mod course_repo;
pub mod error;
pub mod metrics;
pub mod order_repo;
pub mod retry;
pub mod review_repo;
pub mod token_cache;
pub mod types;
pub mod user_repo;

#[cfg(test)]
mod client_tests;

pub use category_repo::CategoryRepository;
pub use client::{StoreClient, StoreConfig};
pub use course_repo::CourseRepository;
pub use error::{StoreError, StoreResult};
pub use order_repo::OrderRepository;
pub use review_repo::ReviewRepository;
pub use types::{Document, FromStoreValue, ToStoreValue, Value};
pub use user_repo::UserRepository;
