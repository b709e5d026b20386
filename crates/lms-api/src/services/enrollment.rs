//! Enrollment service.
//!
//! Enrolls a user into purchased courses with one atomic batch write across
//! the course documents and the user profile.

use tracing::info;

use lms_firestore::{CourseRepository, StoreClient, StoreResult, UserRepository};
use lms_models::{CourseId, UserId};

use crate::error::{ApiError, ApiResult};

/// Enrolls users into courses after a verified payment.
#[derive(Clone)]
pub struct EnrollmentService {
    store: StoreClient,
    courses: CourseRepository,
    users: UserRepository,
}

impl EnrollmentService {
    pub fn new(store: StoreClient, courses: CourseRepository, users: UserRepository) -> Self {
        Self {
            store,
            courses,
            users,
        }
    }

    /// Enroll `user_id` in every course in `course_ids`.
    ///
    /// All course membership lists and the user's course list are updated in
    /// a single batch write, so a crash mid-enrollment cannot leave a user
    /// enrolled in half an order.
    pub async fn enroll(&self, user_id: &UserId, course_ids: &[CourseId]) -> ApiResult<()> {
        let mut writes = Vec::with_capacity(course_ids.len() + 1);

        for course_id in course_ids {
            let course = self
                .courses
                .get(course_id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("Course {} not found", course_id)))?;

            if course.is_enrolled(user_id) {
                // Verified payments are expected to be one-shot; a repeat
                // verify call for the same order lands here
                info!(course = %course_id, user = %user_id, "User already enrolled, skipping");
                continue;
            }

            let mut students = course.students_enrolled;
            students.push(user_id.clone());
            writes.push(self.courses.enrollment_write(course_id, &students));
        }

        let profile = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", user_id)))?;

        let mut enrolled = profile.courses;
        let mut changed = false;
        for course_id in course_ids {
            if !enrolled.contains(course_id) {
                enrolled.push(course_id.clone());
                changed = true;
            }
        }
        if changed {
            writes.push(self.users.courses_write(user_id, &enrolled));
        }

        if writes.is_empty() {
            return Ok(());
        }

        self.commit(writes).await?;
        info!(user = %user_id, courses = course_ids.len(), "Enrollment committed");
        Ok(())
    }

    async fn commit(&self, writes: Vec<lms_firestore::types::Write>) -> StoreResult<()> {
        self.store.batch_write(writes).await?;
        Ok(())
    }
}
