//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "lms_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "lms_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "lms_http_requests_in_flight";

    pub const REVIEWS_CREATED_TOTAL: &str = "lms_reviews_created_total";
    pub const ORDERS_CREATED_TOTAL: &str = "lms_orders_created_total";
    pub const PAYMENTS_VERIFIED_TOTAL: &str = "lms_payments_verified_total";
    pub const PAYMENTS_FAILED_TOTAL: &str = "lms_payments_failed_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "lms_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a created review.
pub fn record_review_created() {
    counter!(names::REVIEWS_CREATED_TOTAL).increment(1);
}

/// Record a created order.
pub fn record_order_created() {
    counter!(names::ORDERS_CREATED_TOTAL).increment(1);
}

/// Record a payment verification outcome.
pub fn record_payment_verified(success: bool) {
    if success {
        counter!(names::PAYMENTS_VERIFIED_TOTAL).increment(1);
    } else {
        counter!(names::PAYMENTS_FAILED_TOTAL).increment(1);
    }
}

/// Record a rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace ids with placeholders).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(
        r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    )
    .unwrap()
    .replace_all(path, ":id");
    let path = regex_lite::Regex::new(r"/[0-9]+(/|$)")
        .unwrap()
        .replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/v1/course/550e8400-e29b-41d4-a716-446655440000"),
            "/api/v1/course/:id"
        );
        assert_eq!(sanitize_path("/api/v1/course/getReviews"), "/api/v1/course/getReviews");
    }
}
