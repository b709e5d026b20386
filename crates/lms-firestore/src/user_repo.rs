//! Typed repository for user profile documents.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use lms_models::{CourseId, CourseProgress, SubSectionId, UserId, UserProfile, UserRole};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{ArrayValue, Document, FromStoreValue, MapValue, ToStoreValue, Value, Write};

/// Collection holding user profile documents.
pub const COLLECTION: &str = "users";

/// Repository for user profile documents.
#[derive(Clone)]
pub struct UserRepository {
    client: StoreClient,
}

impl UserRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Get a user profile by id.
    pub async fn get(&self, user_id: &UserId) -> StoreResult<Option<UserProfile>> {
        let doc = self.client.get_document(COLLECTION, user_id.as_str()).await?;

        match doc {
            Some(d) => Ok(Some(document_to_user(&d)?)),
            None => Ok(None),
        }
    }

    /// Create a new profile document.
    pub async fn create(&self, user: &UserProfile) -> StoreResult<()> {
        let fields = user_to_fields(user);
        self.client
            .create_document(COLLECTION, user.user_id.as_str(), fields)
            .await?;
        info!("Created user profile {}", user.user_id);
        Ok(())
    }

    /// Replace the user's course list.
    pub async fn set_courses(&self, user_id: &UserId, courses: &[CourseId]) -> StoreResult<()> {
        let ids: Vec<String> = courses.iter().map(|c| c.0.clone()).collect();
        let mut fields = HashMap::new();
        fields.insert("courses".to_string(), ids.to_store_value());
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        self.client
            .update_document(
                COLLECTION,
                user_id.as_str(),
                fields,
                Some(vec!["courses".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }

    /// Batch-write entry setting the user's course list.
    pub fn courses_write(&self, user_id: &UserId, courses: &[CourseId]) -> Write {
        let ids: Vec<String> = courses.iter().map(|c| c.0.clone()).collect();
        let mut fields = HashMap::new();
        fields.insert("courses".to_string(), ids.to_store_value());
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        Write::merge(
            self.client.full_document_name(COLLECTION, user_id.as_str()),
            fields,
            vec!["courses".to_string(), "updated_at".to_string()],
        )
    }

    /// Batch-resolve user references. Missing users are omitted.
    pub async fn batch_get(
        &self,
        ids: &[UserId],
    ) -> StoreResult<HashMap<UserId, UserProfile>> {
        let mut resolved = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(100) {
            let names = chunk
                .iter()
                .map(|id| self.client.full_document_name(COLLECTION, id.as_str()))
                .collect();
            let docs = self.client.batch_get_documents(names, None).await?;

            for doc in &docs {
                let user = document_to_user(doc)?;
                resolved.insert(user.user_id.clone(), user);
            }
        }

        Ok(resolved)
    }

    /// Persist the user's per-course progress records.
    pub async fn set_progress(
        &self,
        user_id: &UserId,
        progress: &[CourseProgress],
    ) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("course_progress".to_string(), progress_to_value(progress));
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        self.client
            .update_document(
                COLLECTION,
                user_id.as_str(),
                fields,
                Some(vec!["course_progress".to_string(), "updated_at".to_string()]),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Document conversion
// =============================================================================

fn progress_to_value(progress: &[CourseProgress]) -> Value {
    let values = progress
        .iter()
        .map(|p| {
            let mut fields = HashMap::new();
            fields.insert("course_id".to_string(), p.course_id.0.to_store_value());
            let completed: Vec<String> = p.completed_videos.iter().map(|v| v.0.clone()).collect();
            fields.insert("completed_videos".to_string(), completed.to_store_value());
            Value::MapValue(MapValue { fields: Some(fields) })
        })
        .collect();
    Value::ArrayValue(ArrayValue { values: Some(values) })
}

fn value_to_progress(value: &Value) -> Option<CourseProgress> {
    let Value::MapValue(map) = value else {
        return None;
    };
    let fields = map.fields.as_ref()?;
    let course_id = fields.get("course_id").and_then(String::from_store_value)?;
    let completed = match fields.get("completed_videos") {
        Some(Value::ArrayValue(arr)) => arr
            .values
            .iter()
            .flatten()
            .filter_map(String::from_store_value)
            .map(SubSectionId::from)
            .collect(),
        _ => Vec::new(),
    };
    Some(CourseProgress {
        course_id: CourseId::from(course_id),
        completed_videos: completed,
    })
}

pub(crate) fn user_to_fields(user: &UserProfile) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("user_id".to_string(), user.user_id.0.to_store_value());
    fields.insert("first_name".to_string(), user.first_name.to_store_value());
    fields.insert("last_name".to_string(), user.last_name.to_store_value());
    fields.insert("email".to_string(), user.email.to_store_value());
    fields.insert("image".to_string(), user.image.to_store_value());
    fields.insert("role".to_string(), user.role.as_str().to_store_value());
    let courses: Vec<String> = user.courses.iter().map(|c| c.0.clone()).collect();
    fields.insert("courses".to_string(), courses.to_store_value());
    fields.insert("course_progress".to_string(), progress_to_value(&user.course_progress));
    fields.insert("created_at".to_string(), user.created_at.to_store_value());
    fields.insert("updated_at".to_string(), user.updated_at.to_store_value());
    fields
}

pub(crate) fn document_to_user(doc: &Document) -> StoreResult<UserProfile> {
    let user_id = doc
        .field::<String>("user_id")
        .or_else(|| doc.doc_id().map(str::to_string))
        .ok_or_else(|| StoreError::invalid_response("user document missing id"))?;

    let progress = match doc.fields.as_ref().and_then(|f| f.get("course_progress")) {
        Some(Value::ArrayValue(arr)) => arr
            .values
            .iter()
            .flatten()
            .filter_map(value_to_progress)
            .collect(),
        _ => Vec::new(),
    };

    Ok(UserProfile {
        user_id: UserId::from(user_id),
        first_name: doc.field("first_name").unwrap_or_default(),
        last_name: doc.field("last_name").unwrap_or_default(),
        email: doc.field("email").unwrap_or_default(),
        image: doc.field("image").unwrap_or_default(),
        role: doc
            .field::<String>("role")
            .and_then(|s| UserRole::from_str(&s))
            .unwrap_or_default(),
        courses: doc
            .array_field::<String>("courses")
            .into_iter()
            .map(CourseId::from)
            .collect(),
        course_progress: progress,
        created_at: doc.field("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.field("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserProfile {
        UserProfile {
            user_id: UserId::from("u1"),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            image: String::new(),
            role: UserRole::Instructor,
            courses: vec![CourseId::from("c1")],
            course_progress: vec![CourseProgress {
                course_id: CourseId::from("c1"),
                completed_videos: vec![SubSectionId::from("ss1"), SubSectionId::from("ss2")],
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn user_round_trips_through_fields() {
        let user = sample_user();
        let doc = Document::new(user_to_fields(&user));
        let parsed = document_to_user(&doc).unwrap();

        assert_eq!(parsed.user_id, user.user_id);
        assert_eq!(parsed.role, UserRole::Instructor);
        assert_eq!(parsed.courses, user.courses);
        assert_eq!(parsed.course_progress, user.course_progress);
    }

    #[test]
    fn unknown_role_defaults_to_student() {
        let user = sample_user();
        let mut fields = user_to_fields(&user);
        fields.insert("role".to_string(), "wizard".to_store_value());
        let parsed = document_to_user(&Document::new(fields)).unwrap();
        assert_eq!(parsed.role, UserRole::Student);
    }
}
