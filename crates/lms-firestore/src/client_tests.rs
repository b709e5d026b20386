//! Tests for store client functionality.

use std::time::Duration;

use serial_test::serial;

use crate::client::StoreConfig;
use crate::error::StoreError;

// =============================================================================
// Error type tests
// =============================================================================

#[test]
fn test_error_from_http_status_429() {
    let err = StoreError::from_http_status(429, "rate limited");
    assert!(matches!(err, StoreError::RateLimited(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_500() {
    let err = StoreError::from_http_status(500, "internal error");
    assert!(matches!(err, StoreError::ServerError(500, _)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_503() {
    let err = StoreError::from_http_status(503, "service unavailable");
    assert!(matches!(err, StoreError::ServerError(503, _)));
    assert!(err.is_retryable());
}

#[test]
fn test_error_from_http_status_400() {
    let err = StoreError::from_http_status(400, "bad request");
    assert!(matches!(err, StoreError::RequestFailed(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_http_status_404() {
    let err = StoreError::from_http_status(404, "not found");
    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_http_status_409() {
    let err = StoreError::from_http_status(409, "conflict");
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_error_from_http_status_412() {
    let err = StoreError::from_http_status(412, "precondition");
    assert!(matches!(err, StoreError::PreconditionFailed(_)));
    assert!(err.is_precondition_failed());
    assert!(!err.is_retryable());
}

#[test]
fn test_error_http_status_getter() {
    assert_eq!(StoreError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(
        StoreError::ServerError(502, "bad gateway".into()).http_status(),
        Some(502)
    );
    assert_eq!(StoreError::NotFound("doc".into()).http_status(), Some(404));
}

#[test]
fn test_error_retry_after_ms() {
    assert_eq!(StoreError::RateLimited(5000).retry_after_ms(), Some(5000));
    assert_eq!(
        StoreError::ServerError(500, "error".into()).retry_after_ms(),
        None
    );
}

// =============================================================================
// Config tests
// =============================================================================

#[test]
#[serial]
fn test_config_requires_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(StoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_rejects_empty_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "");
    std::env::remove_var("FIREBASE_PROJECT_ID");
    assert!(StoreConfig::from_env().is_err());
}

#[test]
#[serial]
fn test_config_accepts_firebase_project_id() {
    std::env::remove_var("GCP_PROJECT_ID");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "firebase-project");
}

#[test]
#[serial]
fn test_config_prefers_gcp_project_id() {
    std::env::set_var("GCP_PROJECT_ID", "gcp-project");
    std::env::set_var("FIREBASE_PROJECT_ID", "firebase-project");
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.project_id, "gcp-project");
}

#[test]
#[serial]
fn test_config_parses_timeout_env_vars() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("STORE_CONNECT_TIMEOUT_SECS", "15");
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(15));
    std::env::remove_var("STORE_CONNECT_TIMEOUT_SECS");
}

#[test]
#[serial]
fn test_config_parses_retry_env_vars() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("STORE_RETRY_BASE_MS", "50");
    std::env::set_var("STORE_RETRY_MAX_MS", "2000");
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.retry.base_delay_ms, 50);
    assert_eq!(config.retry.max_delay_ms, 2000);
    std::env::remove_var("STORE_RETRY_BASE_MS");
    std::env::remove_var("STORE_RETRY_MAX_MS");
}

#[test]
#[serial]
fn test_config_handles_invalid_env_values() {
    std::env::set_var("GCP_PROJECT_ID", "test");
    std::env::set_var("STORE_CONNECT_TIMEOUT_SECS", "not-a-number");
    let config = StoreConfig::from_env().unwrap();
    assert_eq!(config.connect_timeout, Duration::from_secs(5));
    std::env::remove_var("STORE_CONNECT_TIMEOUT_SECS");
}
