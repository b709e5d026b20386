//! Course progress handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use lms_models::{CourseId, SubSectionId};

use crate::auth::StudentUser;
use crate::error::{ApiError, ApiResult};
use crate::response::{ok, ApiOk};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub course_id: String,
    pub sub_section_id: String,
}

#[derive(Serialize)]
pub struct ProgressResponse {
    pub course_id: String,
    pub completed_videos: Vec<String>,
}

/// Mark a lecture completed for an enrolled student.
pub async fn update_course_progress(
    State(state): State<AppState>,
    StudentUser(user): StudentUser,
    Json(payload): Json<UpdateProgressRequest>,
) -> ApiResult<ApiOk<ProgressResponse>> {
    let course_id = CourseId::from(payload.course_id);
    let sub_section_id = SubSectionId::from(payload.sub_section_id);

    let course = state
        .courses
        .get(&course_id)
        .await?
        .filter(|c| c.is_enrolled(&user.user_id))
        .ok_or_else(|| ApiError::not_found("Student is not enrolled in the course"))?;

    if !course.subsection_ids().contains(&sub_section_id) {
        return Err(ApiError::not_found(format!(
            "SubSection {} not found in course {}",
            sub_section_id, course_id
        )));
    }

    let mut profile = state
        .users
        .get(&user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;

    let progress = profile.progress_for_mut(&course_id);
    if progress.completed_videos.contains(&sub_section_id) {
        return Err(ApiError::conflict("SubSection already marked completed"));
    }
    progress.completed_videos.push(sub_section_id);

    let completed: Vec<String> = progress
        .completed_videos
        .iter()
        .map(|v| v.0.clone())
        .collect();

    state
        .users
        .set_progress(&user.user_id, &profile.course_progress)
        .await?;

    Ok(ok(ProgressResponse {
        course_id: course_id.0,
        completed_videos: completed,
    }))
}
