//! Course catalog handlers.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use lms_models::{CategoryId, Course, CourseId, CourseStatus, Section, UserId};

use crate::auth::InstructorUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{ok, ApiOk};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200, message = "course_name must be 1..=200 characters"))]
    pub course_name: String,
    #[serde(default)]
    pub course_description: String,
    #[serde(default)]
    pub what_you_will_learn: String,
    /// Price in the smallest currency unit
    pub price: u64,
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    /// "draft" (default) or "published"
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct CourseSummary {
    pub course_id: String,
    pub course_name: String,
    pub price: u64,
    pub thumbnail: String,
    pub instructor: String,
    pub students_enrolled: usize,
    pub review_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Course> for CourseSummary {
    fn from(course: &Course) -> Self {
        Self {
            course_id: course.course_id.0.clone(),
            course_name: course.course_name.clone(),
            price: course.price,
            thumbnail: course.thumbnail.clone(),
            instructor: course.instructor.0.clone(),
            students_enrolled: course.students_enrolled.len(),
            review_count: course.rating_and_reviews.len(),
            created_at: course.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct SectionView {
    pub id: String,
    pub name: String,
    pub sub_sections: Vec<SubSectionView>,
}

#[derive(Serialize)]
pub struct SubSectionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub time_duration: String,
    pub video_url: String,
}

pub(crate) fn curriculum_view(sections: &[Section]) -> Vec<SectionView> {
    sections
        .iter()
        .map(|s| SectionView {
            id: s.id.0.clone(),
            name: s.name.clone(),
            sub_sections: s
                .sub_sections
                .iter()
                .map(|ss| SubSectionView {
                    id: ss.id.0.clone(),
                    title: ss.title.clone(),
                    description: ss.description.clone(),
                    time_duration: ss.time_duration.clone(),
                    video_url: ss.video_url.clone(),
                })
                .collect(),
        })
        .collect()
}

#[derive(Serialize)]
pub struct CourseDetails {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub course_description: String,
    pub what_you_will_learn: String,
    pub tags: Vec<String>,
    pub instructions: Vec<String>,
    pub status: String,
    pub category: Option<CategoryRef>,
    pub instructor_name: Option<String>,
    pub course_content: Vec<SectionView>,
}

#[derive(Serialize)]
pub struct CategoryRef {
    pub category_id: String,
    pub name: String,
}

/// Create a new course owned by the calling instructor.
pub async fn create_course(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<CreateCourseRequest>,
) -> ApiResult<ApiOk<CourseSummary>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let status = match payload.status.as_deref() {
        None | Some("") => CourseStatus::Draft,
        Some(s) => CourseStatus::from_str(s)
            .ok_or_else(|| ApiError::Validation(format!("unknown status '{}'", s)))?,
    };

    let category_id = CategoryId::from(payload.category);
    let category = state
        .categories
        .get(&category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category details not found"))?;

    let mut course = Course::new(
        user.user_id.clone(),
        payload.course_name,
        payload.price,
        category_id.clone(),
    );
    course.course_description = payload.course_description;
    course.what_you_will_learn = payload.what_you_will_learn;
    course.thumbnail = payload.thumbnail;
    course.tags = payload.tags;
    course.instructions = payload.instructions;
    course.status = status;

    state.courses.create(&course).await?;

    // Link the new course into its category and the instructor's profile.
    // These are follow-up writes; failures are logged, not rolled back.
    let mut category_courses = category.courses;
    category_courses.push(course.course_id.clone());
    if let Err(e) = state
        .categories
        .set_courses(&category_id, &category_courses)
        .await
    {
        warn!(course = %course.course_id, category = %category_id, error = %e,
            "Course created but category link failed");
    }

    if let Some(profile) = state.users.get(&user.user_id).await? {
        let mut owned = profile.courses;
        owned.push(course.course_id.clone());
        if let Err(e) = state.users.set_courses(&user.user_id, &owned).await {
            warn!(course = %course.course_id, instructor = %user.user_id, error = %e,
                "Course created but instructor link failed");
        }
    }

    info!(course = %course.course_id, instructor = %user.user_id, "Course created");
    Ok(ok(CourseSummary::from(&course)))
}

/// List all published courses.
pub async fn get_all_courses(State(state): State<AppState>) -> ApiResult<ApiOk<Vec<CourseSummary>>> {
    let courses = state.courses.list_published().await?;
    Ok(ok(courses.iter().map(CourseSummary::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CourseDetailsRequest {
    pub course_id: String,
}

/// Full course page: course, category and instructor expanded.
pub async fn get_course_details(
    State(state): State<AppState>,
    Json(payload): Json<CourseDetailsRequest>,
) -> ApiResult<ApiOk<CourseDetails>> {
    let course_id = CourseId::from(payload.course_id);
    let course = state
        .courses
        .get(&course_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course {} not found", course_id)))?;

    let category = state.categories.get(&course.category).await?.map(|c| CategoryRef {
        category_id: c.category_id.0,
        name: c.name,
    });
    let instructor_name = state
        .users
        .get(&course.instructor)
        .await?
        .map(|u| u.display_name());

    Ok(ok(CourseDetails {
        summary: CourseSummary::from(&course),
        course_description: course.course_description.clone(),
        what_you_will_learn: course.what_you_will_learn.clone(),
        tags: course.tags.clone(),
        instructions: course.instructions.clone(),
        status: course.status.as_str().to_string(),
        category,
        instructor_name,
        course_content: curriculum_view(&course.course_content),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EditCourseRequest {
    pub course_id: String,
    pub course_name: Option<String>,
    pub course_description: Option<String>,
    pub what_you_will_learn: Option<String>,
    pub price: Option<u64>,
    pub thumbnail: Option<String>,
    pub tags: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub status: Option<String>,
}

/// Edit mutable fields of a course owned by the caller.
pub async fn edit_course(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<EditCourseRequest>,
) -> ApiResult<ApiOk<CourseSummary>> {
    let course_id = CourseId::from(payload.course_id);
    let mut course = owned_course(&state, &course_id, &user.user_id).await?;

    if let Some(name) = payload.course_name {
        if name.is_empty() {
            return Err(ApiError::Validation("course_name cannot be empty".to_string()));
        }
        course.course_name = name;
    }
    if let Some(description) = payload.course_description {
        course.course_description = description;
    }
    if let Some(learn) = payload.what_you_will_learn {
        course.what_you_will_learn = learn;
    }
    if let Some(price) = payload.price {
        course.price = price;
    }
    if let Some(thumbnail) = payload.thumbnail {
        course.thumbnail = thumbnail;
    }
    if let Some(tags) = payload.tags {
        course.tags = tags;
    }
    if let Some(instructions) = payload.instructions {
        course.instructions = instructions;
    }
    if let Some(status) = payload.status {
        course.status = CourseStatus::from_str(&status)
            .ok_or_else(|| ApiError::Validation(format!("unknown status '{}'", status)))?;
    }

    state.courses.update(&course).await?;
    Ok(ok(CourseSummary::from(&course)))
}

#[derive(Debug, Deserialize)]
pub struct InstructorCoursesQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct InstructorCoursesResponse {
    pub courses: Vec<CourseSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// List the calling instructor's courses, newest first.
pub async fn get_instructor_courses(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Query(query): Query<InstructorCoursesQuery>,
) -> ApiResult<ApiOk<InstructorCoursesResponse>> {
    let (courses, next_cursor) = state
        .courses
        .list_by_instructor(&user.user_id, query.limit, query.cursor.as_deref())
        .await?;

    Ok(ok(InstructorCoursesResponse {
        courses: courses.iter().map(CourseSummary::from).collect(),
        next_page_token: next_cursor,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteCourseRequest {
    pub course_id: String,
}

#[derive(Serialize)]
pub struct DeleteCourseResponse {
    pub course_id: String,
    pub unenrolled_students: usize,
}

/// Delete a course owned by the caller, unenrolling its students and
/// detaching it from its category.
pub async fn delete_course(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<DeleteCourseRequest>,
) -> ApiResult<ApiOk<DeleteCourseResponse>> {
    let course_id = CourseId::from(payload.course_id);
    let course = owned_course(&state, &course_id, &user.user_id).await?;

    let mut unenrolled = 0usize;
    for student in &course.students_enrolled {
        match state.users.get(student).await? {
            Some(profile) => {
                let remaining: Vec<_> = profile
                    .courses
                    .into_iter()
                    .filter(|c| c != &course_id)
                    .collect();
                state.users.set_courses(student, &remaining).await?;
                unenrolled += 1;
            }
            None => {
                warn!(student = %student, course = %course_id, "Enrolled student has no profile");
            }
        }
    }

    if let Some(category) = state.categories.get(&course.category).await? {
        let remaining: Vec<_> = category
            .courses
            .into_iter()
            .filter(|c| c != &course_id)
            .collect();
        state
            .categories
            .set_courses(&course.category, &remaining)
            .await?;
    }

    state.courses.delete(&course_id).await?;
    info!(course = %course_id, "Course deleted");

    Ok(ok(DeleteCourseResponse {
        course_id: course_id.0,
        unenrolled_students: unenrolled,
    }))
}

/// Load a course and check the caller owns it.
pub(crate) async fn owned_course(
    state: &AppState,
    course_id: &CourseId,
    instructor: &UserId,
) -> ApiResult<Course> {
    let course = state
        .courses
        .get(course_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course {} not found", course_id)))?;

    if &course.instructor != instructor {
        return Err(ApiError::forbidden("You do not own this course"));
    }
    Ok(course)
}
