//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::categories::{category_page_details, create_category, show_all_categories};
use crate::handlers::courses::{
    create_course, delete_course, edit_course, get_all_courses, get_course_details,
    get_instructor_courses,
};
use crate::handlers::payments::{capture_payment, send_payment_success_email, verify_payment};
use crate::handlers::progress::update_course_progress;
use crate::handlers::reviews::{create_rating, get_average_rating, get_reviews};
use crate::handlers::sections::{
    add_section, add_sub_section, delete_section, delete_sub_section, update_section,
    update_sub_section,
};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let course_routes = Router::new()
        // Catalog
        .route("/createCourse", post(create_course))
        .route("/getAllCourses", get(get_all_courses))
        .route("/getCourseDetails", post(get_course_details))
        .route("/editCourse", post(edit_course))
        .route("/getInstructorCourses", get(get_instructor_courses))
        .route("/deleteCourse", delete(delete_course))
        // Curriculum
        .route("/addSection", post(add_section))
        .route("/updateSection", post(update_section))
        .route("/deleteSection", post(delete_section))
        .route("/addSubSection", post(add_sub_section))
        .route("/updateSubSection", post(update_sub_section))
        .route("/deleteSubSection", post(delete_sub_section))
        // Ratings and reviews
        .route("/createRating", post(create_rating))
        .route("/getAverageRating", get(get_average_rating))
        .route("/getReviews", get(get_reviews))
        // Categories
        .route("/createCategory", post(create_category))
        .route("/showAllCategories", get(show_all_categories))
        .route("/getCategoryPageDetails", post(category_page_details))
        // Progress
        .route("/updateCourseProgress", post(update_course_progress));

    let payment_routes = Router::new()
        .route("/capturePayment", post(capture_payment))
        .route("/verifyPayment", post(verify_payment))
        .route("/sendPaymentSuccessEmail", post(send_payment_success_email));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .nest("/course", course_routes)
        .nest("/payment", payment_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
