//! Typed repository for category documents.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use lms_models::{Category, CategoryId, CourseId};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{Document, ToStoreValue, Value};

/// Collection holding category documents.
pub const COLLECTION: &str = "categories";

/// Repository for category documents.
#[derive(Clone)]
pub struct CategoryRepository {
    client: StoreClient,
}

impl CategoryRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Get a category by id.
    pub async fn get(&self, category_id: &CategoryId) -> StoreResult<Option<Category>> {
        let doc = self
            .client
            .get_document(COLLECTION, category_id.as_str())
            .await?;

        match doc {
            Some(d) => Ok(Some(document_to_category(&d)?)),
            None => Ok(None),
        }
    }

    /// Create a new category document.
    pub async fn create(&self, category: &Category) -> StoreResult<()> {
        let fields = category_to_fields(category);
        self.client
            .create_document(COLLECTION, category.category_id.as_str(), fields)
            .await?;
        info!("Created category {} ({})", category.category_id, category.name);
        Ok(())
    }

    /// List all categories.
    pub async fn list_all(&self) -> StoreResult<Vec<Category>> {
        let mut categories = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_documents(COLLECTION, Some(100), page_token.as_deref())
                .await?;

            for doc in page.documents.iter().flatten() {
                categories.push(document_to_category(doc)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(categories)
    }

    /// Replace the category's course list.
    pub async fn set_courses(
        &self,
        category_id: &CategoryId,
        courses: &[CourseId],
    ) -> StoreResult<()> {
        let ids: Vec<String> = courses.iter().map(|c| c.0.clone()).collect();
        let mut fields = HashMap::new();
        fields.insert("courses".to_string(), ids.to_store_value());

        self.client
            .update_document(
                COLLECTION,
                category_id.as_str(),
                fields,
                Some(vec!["courses".to_string()]),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Document conversion
// =============================================================================

pub(crate) fn category_to_fields(category: &Category) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("category_id".to_string(), category.category_id.0.to_store_value());
    fields.insert("name".to_string(), category.name.to_store_value());
    fields.insert("description".to_string(), category.description.to_store_value());
    let courses: Vec<String> = category.courses.iter().map(|c| c.0.clone()).collect();
    fields.insert("courses".to_string(), courses.to_store_value());
    fields.insert("created_at".to_string(), category.created_at.to_store_value());
    fields
}

pub(crate) fn document_to_category(doc: &Document) -> StoreResult<Category> {
    let category_id = doc
        .field::<String>("category_id")
        .or_else(|| doc.doc_id().map(str::to_string))
        .ok_or_else(|| StoreError::invalid_response("category document missing id"))?;

    Ok(Category {
        category_id: CategoryId::from(category_id.clone()),
        name: doc.field("name").ok_or_else(|| {
            StoreError::invalid_response(format!("category {} missing field name", category_id))
        })?,
        description: doc.field("description").unwrap_or_default(),
        courses: doc
            .array_field::<String>("courses")
            .into_iter()
            .map(CourseId::from)
            .collect(),
        created_at: doc.field("created_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_fields() {
        let mut category = Category::new("Web Development", "Everything HTTP");
        category.courses = vec![CourseId::from("c1"), CourseId::from("c2")];

        let doc = Document::new(category_to_fields(&category));
        let parsed = document_to_category(&doc).unwrap();

        assert_eq!(parsed.category_id, category.category_id);
        assert_eq!(parsed.name, "Web Development");
        assert_eq!(parsed.courses, category.courses);
    }
}
