//! User profile models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, SubSectionId, UserId};

/// Account role, carried in the auth token and on the profile document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Instructor => "instructor",
            UserRole::Admin => "admin",
        }
    }

    /// Parse from a stored string, `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "student" => Some(UserRole::Student),
            "instructor" => Some(UserRole::Instructor),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-course progress: subsections the student has completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub course_id: CourseId,
    #[serde(default)]
    pub completed_videos: Vec<SubSectionId>,
}

impl CourseProgress {
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            completed_videos: Vec::new(),
        }
    }
}

/// User profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Unique user ID (matches the auth subject)
    pub user_id: UserId,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    /// Profile image URL
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub role: UserRole,

    /// Courses the user is enrolled in (students) or owns (instructors)
    #[serde(default)]
    pub courses: Vec<CourseId>,

    /// Progress records for enrolled courses
    #[serde(default)]
    pub course_progress: Vec<CourseProgress>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Progress record for a course, if any.
    pub fn progress_for(&self, course_id: &CourseId) -> Option<&CourseProgress> {
        self.course_progress.iter().find(|p| &p.course_id == course_id)
    }

    /// Progress record for a course, creating it if missing.
    pub fn progress_for_mut(&mut self, course_id: &CourseId) -> &mut CourseProgress {
        if let Some(idx) = self
            .course_progress
            .iter()
            .position(|p| &p.course_id == course_id)
        {
            &mut self.course_progress[idx]
        } else {
            self.course_progress.push(CourseProgress::new(course_id.clone()));
            self.course_progress.last_mut().expect("just pushed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserProfile {
        UserProfile {
            user_id: UserId::from("u1"),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            image: String::new(),
            role: UserRole::Student,
            courses: Vec::new(),
            course_progress: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn role_string_round_trip() {
        for role in [UserRole::Student, UserRole::Instructor, UserRole::Admin] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("superuser"), None);
    }

    #[test]
    fn progress_created_on_demand() {
        let mut user = sample_user();
        let course = CourseId::from("c1");
        assert!(user.progress_for(&course).is_none());

        user.progress_for_mut(&course)
            .completed_videos
            .push(SubSectionId::from("ss1"));

        assert_eq!(user.progress_for(&course).unwrap().completed_videos.len(), 1);
        // Second lookup reuses the same record
        user.progress_for_mut(&course)
            .completed_videos
            .push(SubSectionId::from("ss2"));
        assert_eq!(user.course_progress.len(), 1);
    }

    #[test]
    fn display_name_joins_parts() {
        assert_eq!(sample_user().display_name(), "Ada Lovelace");
    }
}
