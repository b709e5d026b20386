//! Curriculum handlers: sections and subsections.
//!
//! The curriculum is embedded in the course document; every mutation is a
//! read-modify-write guarded by the course's update time, so two
//! instructors editing concurrently get a conflict instead of silently
//! losing one edit.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use lms_models::{Course, CourseId, Section, SectionId, SubSection, SubSectionId, UserId};

use crate::auth::InstructorUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::courses::{curriculum_view, SectionView};
use crate::response::{ok, ApiOk};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CurriculumResponse {
    pub course_id: String,
    pub course_content: Vec<SectionView>,
}

fn curriculum_response(course_id: &CourseId, sections: &[Section]) -> CurriculumResponse {
    CurriculumResponse {
        course_id: course_id.0.clone(),
        course_content: curriculum_view(sections),
    }
}

/// Load an owned course plus its update time for the preconditioned write.
async fn owned_course_with_time(
    state: &AppState,
    course_id: &CourseId,
    instructor: &UserId,
) -> ApiResult<(Course, Option<String>)> {
    let (course, update_time) = state
        .courses
        .get_with_update_time(course_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Course {} not found", course_id)))?;

    if &course.instructor != instructor {
        return Err(ApiError::forbidden("You do not own this course"));
    }
    Ok((course, update_time))
}

/// Write the curriculum back, mapping a lost precondition to a conflict.
async fn store_curriculum(
    state: &AppState,
    course_id: &CourseId,
    sections: &[Section],
    update_time: Option<String>,
) -> ApiResult<()> {
    state
        .courses
        .set_curriculum(course_id, sections, update_time.as_deref())
        .await
        .map_err(|e| {
            if e.is_precondition_failed() {
                ApiError::conflict("Course was modified concurrently, retry the edit")
            } else {
                e.into()
            }
        })
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddSectionRequest {
    pub course_id: String,
    #[validate(length(min = 1, max = 200, message = "section_name must be 1..=200 characters"))]
    pub section_name: String,
}

/// Append a new section to a course.
pub async fn add_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<AddSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let course_id = CourseId::from(payload.course_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    course.course_content.push(Section::new(payload.section_name));
    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;

    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSectionRequest {
    pub course_id: String,
    pub section_id: String,
    #[validate(length(min = 1, max = 200, message = "section_name must be 1..=200 characters"))]
    pub section_name: String,
}

/// Rename a section.
pub async fn update_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<UpdateSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let course_id = CourseId::from(payload.course_id);
    let section_id = SectionId::from(payload.section_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    let section = course
        .section_mut(&section_id)
        .ok_or_else(|| ApiError::not_found(format!("Section {} not found", section_id)))?;
    section.name = payload.section_name;

    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;
    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteSectionRequest {
    pub course_id: String,
    pub section_id: String,
}

/// Remove a section and everything under it.
pub async fn delete_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<DeleteSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    let course_id = CourseId::from(payload.course_id);
    let section_id = SectionId::from(payload.section_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    let before = course.course_content.len();
    course.course_content.retain(|s| s.id != section_id);
    if course.course_content.len() == before {
        return Err(ApiError::not_found(format!("Section {} not found", section_id)));
    }

    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;
    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddSubSectionRequest {
    pub course_id: String,
    pub section_id: String,
    #[validate(length(min = 1, max = 200, message = "title must be 1..=200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time_duration: String,
    #[serde(default)]
    pub video_url: String,
}

/// Append a lecture to a section.
pub async fn add_sub_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<AddSubSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let course_id = CourseId::from(payload.course_id);
    let section_id = SectionId::from(payload.section_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    let section = course
        .section_mut(&section_id)
        .ok_or_else(|| ApiError::not_found(format!("Section {} not found", section_id)))?;
    section.sub_sections.push(SubSection {
        id: SubSectionId::new(),
        title: payload.title,
        description: payload.description,
        time_duration: payload.time_duration,
        video_url: payload.video_url,
    });

    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;
    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubSectionRequest {
    pub course_id: String,
    pub section_id: String,
    pub sub_section_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_duration: Option<String>,
    pub video_url: Option<String>,
}

/// Edit a lecture's fields.
pub async fn update_sub_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<UpdateSubSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    let course_id = CourseId::from(payload.course_id);
    let section_id = SectionId::from(payload.section_id);
    let sub_section_id = SubSectionId::from(payload.sub_section_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    let section = course
        .section_mut(&section_id)
        .ok_or_else(|| ApiError::not_found(format!("Section {} not found", section_id)))?;
    let sub = section
        .sub_sections
        .iter_mut()
        .find(|ss| ss.id == sub_section_id)
        .ok_or_else(|| {
            ApiError::not_found(format!("SubSection {} not found", sub_section_id))
        })?;

    if let Some(title) = payload.title {
        if title.is_empty() {
            return Err(ApiError::Validation("title cannot be empty".to_string()));
        }
        sub.title = title;
    }
    if let Some(description) = payload.description {
        sub.description = description;
    }
    if let Some(duration) = payload.time_duration {
        sub.time_duration = duration;
    }
    if let Some(url) = payload.video_url {
        sub.video_url = url;
    }

    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;
    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteSubSectionRequest {
    pub course_id: String,
    pub section_id: String,
    pub sub_section_id: String,
}

/// Remove a lecture from a section.
pub async fn delete_sub_section(
    State(state): State<AppState>,
    InstructorUser(user): InstructorUser,
    Json(payload): Json<DeleteSubSectionRequest>,
) -> ApiResult<ApiOk<CurriculumResponse>> {
    let course_id = CourseId::from(payload.course_id);
    let section_id = SectionId::from(payload.section_id);
    let sub_section_id = SubSectionId::from(payload.sub_section_id);
    let (mut course, update_time) = owned_course_with_time(&state, &course_id, &user.user_id).await?;

    let section = course
        .section_mut(&section_id)
        .ok_or_else(|| ApiError::not_found(format!("Section {} not found", section_id)))?;

    let before = section.sub_sections.len();
    section.sub_sections.retain(|ss| ss.id != sub_section_id);
    if section.sub_sections.len() == before {
        return Err(ApiError::not_found(format!(
            "SubSection {} not found",
            sub_section_id
        )));
    }

    store_curriculum(&state, &course_id, &course.course_content, update_time).await?;
    Ok(ok(curriculum_response(&course_id, &course.course_content)))
}
