//! Course and curriculum models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CategoryId, CourseId, ReviewId, SectionId, SubSectionId, UserId};

/// Publication status of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    /// Course is being authored and not visible in the catalog
    #[default]
    Draft,
    /// Course is visible and purchasable
    Published,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
        }
    }

    /// Parse from a stored string, `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CourseStatus::Draft),
            "published" => Some(CourseStatus::Published),
            _ => None,
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lecture unit embedded in a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSection {
    pub id: SubSectionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Playback length as entered by the instructor (e.g. "12:30")
    #[serde(default)]
    pub time_duration: String,
    /// Hosted lecture video URL
    #[serde(default)]
    pub video_url: String,
}

/// An ordered curriculum section embedded in a course document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    #[serde(default)]
    pub sub_sections: Vec<SubSection>,
}

impl Section {
    /// Create an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SectionId::new(),
            name: name.into(),
            sub_sections: Vec::new(),
        }
    }
}

/// Course document stored in the catalog collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique course ID
    pub course_id: CourseId,

    /// Instructor (owner) user ID
    pub instructor: UserId,

    /// Course title
    pub course_name: String,

    /// Long-form description
    #[serde(default)]
    pub course_description: String,

    /// What students will learn
    #[serde(default)]
    pub what_you_will_learn: String,

    /// Price in the smallest currency unit
    pub price: u64,

    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail: String,

    /// Category reference
    pub category: CategoryId,

    /// Search tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Pre-requisites / instructions shown on the course page
    #[serde(default)]
    pub instructions: Vec<String>,

    /// Publication status
    #[serde(default)]
    pub status: CourseStatus,

    /// Embedded curriculum, in display order
    #[serde(default)]
    pub course_content: Vec<Section>,

    /// Users enrolled in this course
    #[serde(default)]
    pub students_enrolled: Vec<UserId>,

    /// References to rating-and-review documents, in creation order
    #[serde(default)]
    pub rating_and_reviews: Vec<ReviewId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Create a new draft course.
    pub fn new(
        instructor: UserId,
        course_name: impl Into<String>,
        price: u64,
        category: CategoryId,
    ) -> Self {
        let now = Utc::now();
        Self {
            course_id: CourseId::new(),
            instructor,
            course_name: course_name.into(),
            course_description: String::new(),
            what_you_will_learn: String::new(),
            price,
            thumbnail: String::new(),
            category,
            tags: Vec::new(),
            instructions: Vec::new(),
            status: CourseStatus::Draft,
            course_content: Vec::new(),
            students_enrolled: Vec::new(),
            rating_and_reviews: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the given user is enrolled in this course.
    pub fn is_enrolled(&self, user_id: &UserId) -> bool {
        self.students_enrolled.contains(user_id)
    }

    /// Find a section by id.
    pub fn section(&self, section_id: &SectionId) -> Option<&Section> {
        self.course_content.iter().find(|s| &s.id == section_id)
    }

    /// Find a section by id, mutably.
    pub fn section_mut(&mut self, section_id: &SectionId) -> Option<&mut Section> {
        self.course_content.iter_mut().find(|s| &s.id == section_id)
    }

    /// All subsection ids across the curriculum.
    pub fn subsection_ids(&self) -> Vec<SubSectionId> {
        self.course_content
            .iter()
            .flat_map(|s| s.sub_sections.iter().map(|ss| ss.id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_course() -> Course {
        Course::new(
            UserId::from("instructor-1"),
            "Rust for Backend Engineers",
            49900,
            CategoryId::from("cat-1"),
        )
    }

    #[test]
    fn new_course_starts_as_empty_draft() {
        let course = sample_course();
        assert_eq!(course.status, CourseStatus::Draft);
        assert!(course.course_content.is_empty());
        assert!(course.students_enrolled.is_empty());
        assert!(course.rating_and_reviews.is_empty());
    }

    #[test]
    fn enrollment_check() {
        let mut course = sample_course();
        let student = UserId::from("student-1");
        assert!(!course.is_enrolled(&student));
        course.students_enrolled.push(student.clone());
        assert!(course.is_enrolled(&student));
    }

    #[test]
    fn section_lookup_by_id() {
        let mut course = sample_course();
        let section = Section::new("Getting Started");
        let id = section.id.clone();
        course.course_content.push(section);

        assert_eq!(course.section(&id).unwrap().name, "Getting Started");
        assert!(course.section(&SectionId::from("missing")).is_none());
    }

    #[test]
    fn status_string_round_trip() {
        assert_eq!(CourseStatus::from_str("published"), Some(CourseStatus::Published));
        assert_eq!(CourseStatus::from_str("draft"), Some(CourseStatus::Draft));
        assert_eq!(CourseStatus::from_str("archived"), None);
    }
}
