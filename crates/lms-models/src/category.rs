//! Category model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CategoryId, CourseId};

/// Catalog category document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Courses filed under this category
    #[serde(default)]
    pub courses: Vec<CourseId>,

    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category_id: CategoryId::new(),
            name: name.into(),
            description: description.into(),
            courses: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
