//! Rating and review handlers.

use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use lms_models::{CourseId, Rating, RatingAndReview};

use crate::auth::StudentUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics::record_review_created;
use crate::response::{ok, ApiOk};
use crate::state::AppState;

/// Message returned when a course has no ratings yet.
const NO_RATINGS_MESSAGE: &str = "Average rating is 0, no ratings given till now";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRatingRequest {
    /// Star rating, 1..=5
    pub rating: i64,
    /// Review body
    #[validate(length(min = 1, max = 5000, message = "review must be 1..=5000 characters"))]
    pub review: String,
    pub course_id: String,
}

#[derive(Serialize)]
pub struct ReviewResponse {
    pub review_id: String,
    pub user: String,
    pub course: String,
    pub rating: i64,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

impl From<RatingAndReview> for ReviewResponse {
    fn from(review: RatingAndReview) -> Self {
        Self {
            review_id: review.review_id.0,
            user: review.user.0,
            course: review.course.0,
            rating: review.rating.into(),
            review: review.review,
            created_at: review.created_at,
        }
    }
}

/// Create a rating and review for a course the student is enrolled in.
///
/// Preconditions are checked in sequence: enrollment first, then review
/// uniqueness. The review insert and the course's reference append are two
/// separate writes with no transaction around them.
pub async fn create_rating(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    Json(payload): Json<CreateRatingRequest>,
) -> ApiResult<ApiOk<ReviewResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let rating = Rating::new(payload.rating).map_err(|e| ApiError::Validation(e.to_string()))?;
    let course_id = CourseId::from(payload.course_id);

    let course = state
        .courses
        .get(&course_id)
        .await?
        .filter(|c| c.is_enrolled(&user.user_id))
        .ok_or_else(|| ApiError::not_found("Student is not enrolled in the course"))?;

    if state
        .reviews
        .find_by_user_and_course(&user.user_id, &course_id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("Course is already reviewed by the user"));
    }

    let review = RatingAndReview::new(user.user_id, course_id.clone(), rating, payload.review);
    state.reviews.create(&review).await?;

    let mut review_refs = course.rating_and_reviews;
    review_refs.push(review.review_id.clone());
    if let Err(e) = state.courses.set_review_refs(&course_id, &review_refs).await {
        // The review document exists but the course list was not updated;
        // surface the failure instead of pretending the write pair succeeded
        warn!(
            review = %review.review_id,
            course = %course_id,
            error = %e,
            "Review created but course reference append failed"
        );
        return Err(e.into());
    }

    record_review_created();
    Ok(ok(ReviewResponse::from(review)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AverageRatingParams {
    pub course_id: Option<String>,
}

#[derive(Serialize)]
pub struct AverageRatingResponse {
    pub average_rating: f64,
    pub rating_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Mean rating of a course, computed server-side.
///
/// The course id is read from the query string, or from a JSON body for
/// compatibility with clients that send `GET` requests with one.
pub async fn get_average_rating(
    State(state): State<AppState>,
    Query(params): Query<AverageRatingParams>,
    body: Option<Json<AverageRatingParams>>,
) -> ApiResult<ApiOk<AverageRatingResponse>> {
    let course_id = params
        .course_id
        .or_else(|| body.and_then(|Json(b)| b.course_id))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("course_id is required"))?;

    let summary = state
        .reviews
        .average_for_course(&CourseId::from(course_id))
        .await?;

    let response = match summary.average {
        Some(average) => AverageRatingResponse {
            average_rating: average,
            rating_count: summary.count,
            message: None,
        },
        // Zero reviews: distinguish "no data" from a genuine zero average
        None => AverageRatingResponse {
            average_rating: 0.0,
            rating_count: 0,
            message: Some(NO_RATINGS_MESSAGE.to_string()),
        },
    };

    Ok(ok(response))
}

#[derive(Serialize)]
pub struct ReviewUserRef {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub image: String,
}

#[derive(Serialize)]
pub struct ReviewCourseRef {
    pub course_id: String,
    pub course_name: String,
}

#[derive(Serialize)]
pub struct ExpandedReview {
    pub review_id: String,
    pub rating: i64,
    pub review: String,
    pub created_at: DateTime<Utc>,
    pub user: Option<ReviewUserRef>,
    pub course: Option<ReviewCourseRef>,
}

/// List every review system-wide, sorted by rating descending, with user
/// and course references expanded.
pub async fn get_reviews(State(state): State<AppState>) -> ApiResult<ApiOk<Vec<ExpandedReview>>> {
    let reviews = state.reviews.list_all_by_rating_desc().await?;

    let user_ids: Vec<_> = reviews
        .iter()
        .map(|r| r.user.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let course_ids: Vec<_> = reviews
        .iter()
        .map(|r| r.course.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let users = state.users.batch_get(&user_ids).await?;
    let courses = state.courses.batch_get(&course_ids).await?;

    let expanded = reviews
        .into_iter()
        .map(|review| {
            let user = users.get(&review.user).map(|u| ReviewUserRef {
                user_id: u.user_id.0.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
                email: u.email.clone(),
                image: u.image.clone(),
            });
            let course = courses.get(&review.course).map(|c| ReviewCourseRef {
                course_id: c.course_id.0.clone(),
                course_name: c.course_name.clone(),
            });
            ExpandedReview {
                review_id: review.review_id.0,
                rating: review.rating.into(),
                review: review.review,
                created_at: review.created_at,
                user,
                course,
            }
        })
        .collect();

    Ok(ok(expanded))
}
