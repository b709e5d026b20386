//! Typed repository for course documents.

use std::collections::HashMap;

use chrono::Utc;
use tracing::info;

use lms_models::{
    Course, CourseId, CourseStatus, ReviewId, Section, SectionId, SubSection, SubSectionId, UserId,
};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    ArrayValue, Cursor, Document, FromStoreValue, MapValue, Order, StructuredQuery, ToStoreValue,
    Value, Write,
};

/// Collection holding course documents.
pub const COLLECTION: &str = "courses";

/// Repository for course documents.
#[derive(Clone)]
pub struct CourseRepository {
    client: StoreClient,
}

impl CourseRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Get a course by id.
    pub async fn get(&self, course_id: &CourseId) -> StoreResult<Option<Course>> {
        let doc = self.client.get_document(COLLECTION, course_id.as_str()).await?;

        match doc {
            Some(d) => Ok(Some(document_to_course(&d)?)),
            None => Ok(None),
        }
    }

    /// Get a course along with its raw update time (for preconditioned writes).
    pub async fn get_with_update_time(
        &self,
        course_id: &CourseId,
    ) -> StoreResult<Option<(Course, Option<String>)>> {
        let doc = self.client.get_document(COLLECTION, course_id.as_str()).await?;

        match doc {
            Some(d) => {
                let course = document_to_course(&d)?;
                Ok(Some((course, d.update_time)))
            }
            None => Ok(None),
        }
    }

    /// Create a new course document.
    pub async fn create(&self, course: &Course) -> StoreResult<()> {
        let fields = course_to_fields(course);
        self.client
            .create_document(COLLECTION, course.course_id.as_str(), fields)
            .await?;
        info!("Created course {}", course.course_id);
        Ok(())
    }

    /// Overwrite the mutable catalog fields of a course.
    pub async fn update(&self, course: &Course) -> StoreResult<()> {
        let mut fields = course_to_fields(course);
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());
        let mask: Vec<String> = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, course.course_id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }

    /// Replace the embedded curriculum, guarded by the course's update time
    /// so concurrent edits fail with `PreconditionFailed` instead of
    /// clobbering each other.
    pub async fn set_curriculum(
        &self,
        course_id: &CourseId,
        sections: &[Section],
        update_time: Option<&str>,
    ) -> StoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("course_content".to_string(), sections_to_value(sections));
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        self.client
            .update_document_with_precondition(
                COLLECTION,
                course_id.as_str(),
                fields,
                Some(vec!["course_content".to_string(), "updated_at".to_string()]),
                update_time,
            )
            .await?;
        Ok(())
    }

    /// Append a review reference to the course's review list.
    pub async fn set_review_refs(
        &self,
        course_id: &CourseId,
        review_ids: &[ReviewId],
    ) -> StoreResult<()> {
        let ids: Vec<String> = review_ids.iter().map(|r| r.0.clone()).collect();
        let mut fields = HashMap::new();
        fields.insert("rating_and_reviews".to_string(), ids.to_store_value());
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        self.client
            .update_document(
                COLLECTION,
                course_id.as_str(),
                fields,
                Some(vec![
                    "rating_and_reviews".to_string(),
                    "updated_at".to_string(),
                ]),
            )
            .await?;
        Ok(())
    }

    /// Batch-write entry setting a course's enrolled students.
    pub fn enrollment_write(&self, course_id: &CourseId, students: &[UserId]) -> Write {
        let ids: Vec<String> = students.iter().map(|u| u.0.clone()).collect();
        let mut fields = HashMap::new();
        fields.insert("students_enrolled".to_string(), ids.to_store_value());
        fields.insert("updated_at".to_string(), Utc::now().to_store_value());

        Write::merge(
            self.client.full_document_name(COLLECTION, course_id.as_str()),
            fields,
            vec!["students_enrolled".to_string(), "updated_at".to_string()],
        )
    }

    /// Batch-resolve course references. Missing courses are omitted.
    pub async fn batch_get(
        &self,
        ids: &[CourseId],
    ) -> StoreResult<HashMap<CourseId, Course>> {
        let mut resolved = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(100) {
            let names = chunk
                .iter()
                .map(|id| self.client.full_document_name(COLLECTION, id.as_str()))
                .collect();
            let docs = self.client.batch_get_documents(names, None).await?;

            for doc in &docs {
                let course = document_to_course(doc)?;
                resolved.insert(course.course_id.clone(), course);
            }
        }

        Ok(resolved)
    }

    /// Delete a course document.
    pub async fn delete(&self, course_id: &CourseId) -> StoreResult<()> {
        self.client.delete_document(COLLECTION, course_id.as_str()).await
    }

    /// List published courses, newest first.
    pub async fn list_published(&self) -> StoreResult<Vec<Course>> {
        let mut query = StructuredQuery::collection(COLLECTION);
        query.r#where = Some(crate::types::Filter::field(
            "status",
            "EQUAL",
            Value::StringValue(CourseStatus::Published.as_str().to_string()),
        ));
        query.order_by = Some(vec![Order::desc("created_at")]);

        let docs = self.client.run_query(None, query).await?;
        docs.iter().map(document_to_course).collect()
    }

    /// List an instructor's courses, newest first, with cursor pagination.
    pub async fn list_by_instructor(
        &self,
        instructor: &UserId,
        limit: Option<u32>,
        cursor_created_at: Option<&str>,
    ) -> StoreResult<(Vec<Course>, Option<String>)> {
        let effective_limit = limit.unwrap_or(50).clamp(1, 100) as i32;

        let mut query = StructuredQuery::collection(COLLECTION);
        query.r#where = Some(crate::types::Filter::field(
            "instructor",
            "EQUAL",
            Value::StringValue(instructor.0.clone()),
        ));
        query.order_by = Some(vec![Order::desc("created_at")]);
        query.limit = Some(effective_limit);

        if let Some(ts) = cursor_created_at {
            query.start_at = Some(Cursor {
                values: vec![Value::TimestampValue(ts.to_string())],
                before: Some(false),
            });
        }

        let docs = self.client.run_query(None, query).await?;
        let courses: Vec<Course> = docs
            .iter()
            .map(document_to_course)
            .collect::<StoreResult<_>>()?;

        let next_cursor = courses.last().map(|c| c.created_at.to_rfc3339());
        Ok((courses, next_cursor))
    }
}

// =============================================================================
// Document conversion
// =============================================================================

fn sub_section_to_value(sub: &SubSection) -> Value {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), sub.id.0.to_store_value());
    fields.insert("title".to_string(), sub.title.to_store_value());
    fields.insert("description".to_string(), sub.description.to_store_value());
    fields.insert("time_duration".to_string(), sub.time_duration.to_store_value());
    fields.insert("video_url".to_string(), sub.video_url.to_store_value());
    Value::MapValue(MapValue { fields: Some(fields) })
}

fn value_to_sub_section(value: &Value) -> Option<SubSection> {
    let Value::MapValue(map) = value else {
        return None;
    };
    let fields = map.fields.as_ref()?;
    let get = |name: &str| fields.get(name).and_then(String::from_store_value);
    Some(SubSection {
        id: SubSectionId::from(get("id")?),
        title: get("title")?,
        description: get("description").unwrap_or_default(),
        time_duration: get("time_duration").unwrap_or_default(),
        video_url: get("video_url").unwrap_or_default(),
    })
}

fn section_to_value(section: &Section) -> Value {
    let mut fields = HashMap::new();
    fields.insert("id".to_string(), section.id.0.to_store_value());
    fields.insert("name".to_string(), section.name.to_store_value());
    fields.insert(
        "sub_sections".to_string(),
        Value::ArrayValue(ArrayValue {
            values: Some(section.sub_sections.iter().map(sub_section_to_value).collect()),
        }),
    );
    Value::MapValue(MapValue { fields: Some(fields) })
}

fn value_to_section(value: &Value) -> Option<Section> {
    let Value::MapValue(map) = value else {
        return None;
    };
    let fields = map.fields.as_ref()?;
    let id = fields.get("id").and_then(String::from_store_value)?;
    let name = fields.get("name").and_then(String::from_store_value)?;
    let sub_sections = match fields.get("sub_sections") {
        Some(Value::ArrayValue(arr)) => arr
            .values
            .iter()
            .flatten()
            .filter_map(value_to_sub_section)
            .collect(),
        _ => Vec::new(),
    };
    Some(Section {
        id: SectionId::from(id),
        name,
        sub_sections,
    })
}

fn sections_to_value(sections: &[Section]) -> Value {
    Value::ArrayValue(ArrayValue {
        values: Some(sections.iter().map(section_to_value).collect()),
    })
}

pub(crate) fn course_to_fields(course: &Course) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("course_id".to_string(), course.course_id.0.to_store_value());
    fields.insert("instructor".to_string(), course.instructor.0.to_store_value());
    fields.insert("course_name".to_string(), course.course_name.to_store_value());
    fields.insert(
        "course_description".to_string(),
        course.course_description.to_store_value(),
    );
    fields.insert(
        "what_you_will_learn".to_string(),
        course.what_you_will_learn.to_store_value(),
    );
    fields.insert("price".to_string(), course.price.to_store_value());
    fields.insert("thumbnail".to_string(), course.thumbnail.to_store_value());
    fields.insert("category".to_string(), course.category.0.to_store_value());
    fields.insert("tags".to_string(), course.tags.to_store_value());
    fields.insert("instructions".to_string(), course.instructions.to_store_value());
    fields.insert("status".to_string(), course.status.as_str().to_store_value());
    fields.insert("course_content".to_string(), sections_to_value(&course.course_content));
    let students: Vec<String> = course.students_enrolled.iter().map(|u| u.0.clone()).collect();
    fields.insert("students_enrolled".to_string(), students.to_store_value());
    let reviews: Vec<String> = course.rating_and_reviews.iter().map(|r| r.0.clone()).collect();
    fields.insert("rating_and_reviews".to_string(), reviews.to_store_value());
    fields.insert("created_at".to_string(), course.created_at.to_store_value());
    fields.insert("updated_at".to_string(), course.updated_at.to_store_value());
    fields
}

pub(crate) fn document_to_course(doc: &Document) -> StoreResult<Course> {
    let course_id = doc
        .field::<String>("course_id")
        .or_else(|| doc.doc_id().map(str::to_string))
        .ok_or_else(|| StoreError::invalid_response("course document missing id"))?;

    let missing = |name: &str| {
        StoreError::invalid_response(format!("course {} missing field {}", course_id, name))
    };

    let sections = match doc.fields.as_ref().and_then(|f| f.get("course_content")) {
        Some(Value::ArrayValue(arr)) => arr
            .values
            .iter()
            .flatten()
            .filter_map(value_to_section)
            .collect(),
        _ => Vec::new(),
    };

    Ok(Course {
        course_id: CourseId::from(course_id.clone()),
        instructor: UserId::from(doc.field::<String>("instructor").ok_or_else(|| missing("instructor"))?),
        course_name: doc.field("course_name").ok_or_else(|| missing("course_name"))?,
        course_description: doc.field("course_description").unwrap_or_default(),
        what_you_will_learn: doc.field("what_you_will_learn").unwrap_or_default(),
        price: doc.field("price").unwrap_or(0),
        thumbnail: doc.field("thumbnail").unwrap_or_default(),
        category: doc
            .field::<String>("category")
            .map(Into::into)
            .unwrap_or_default(),
        tags: doc.array_field("tags"),
        instructions: doc.array_field("instructions"),
        status: doc
            .field::<String>("status")
            .and_then(|s| CourseStatus::from_str(&s))
            .unwrap_or_default(),
        course_content: sections,
        students_enrolled: doc
            .array_field::<String>("students_enrolled")
            .into_iter()
            .map(UserId::from)
            .collect(),
        rating_and_reviews: doc
            .array_field::<String>("rating_and_reviews")
            .into_iter()
            .map(ReviewId::from)
            .collect(),
        created_at: doc.field("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.field("updated_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_models::CategoryId;

    fn sample_course() -> Course {
        let mut course = Course::new(
            UserId::from("instr-1"),
            "Async Rust in Practice",
            129900,
            CategoryId::from("cat-web"),
        );
        course.status = CourseStatus::Published;
        course.tags = vec!["rust".to_string(), "async".to_string()];
        course.students_enrolled = vec![UserId::from("s1"), UserId::from("s2")];
        course.rating_and_reviews = vec![ReviewId::from("r1")];

        let mut section = Section::new("Futures");
        section.sub_sections.push(SubSection {
            id: SubSectionId::from("ss1"),
            title: "Polling".to_string(),
            description: "How poll works".to_string(),
            time_duration: "10:30".to_string(),
            video_url: "https://cdn.example.com/polling.mp4".to_string(),
        });
        course.course_content.push(section);
        course
    }

    #[test]
    fn course_round_trips_through_fields() {
        let course = sample_course();
        let doc = Document::new(course_to_fields(&course));
        let parsed = document_to_course(&doc).unwrap();

        assert_eq!(parsed.course_id, course.course_id);
        assert_eq!(parsed.instructor, course.instructor);
        assert_eq!(parsed.course_name, course.course_name);
        assert_eq!(parsed.price, course.price);
        assert_eq!(parsed.status, CourseStatus::Published);
        assert_eq!(parsed.tags, course.tags);
        assert_eq!(parsed.students_enrolled, course.students_enrolled);
        assert_eq!(parsed.rating_and_reviews, course.rating_and_reviews);
        assert_eq!(parsed.course_content, course.course_content);
    }

    #[test]
    fn course_id_falls_back_to_resource_name() {
        let course = sample_course();
        let mut fields = course_to_fields(&course);
        fields.remove("course_id");
        let mut doc = Document::new(fields);
        doc.name = Some(format!(
            "projects/p/databases/d/documents/courses/{}",
            course.course_id
        ));

        let parsed = document_to_course(&doc).unwrap();
        assert_eq!(parsed.course_id, course.course_id);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let course = sample_course();
        let mut fields = course_to_fields(&course);
        fields.remove("course_name");
        let doc = Document::new(fields);
        assert!(document_to_course(&doc).is_err());
    }
}
