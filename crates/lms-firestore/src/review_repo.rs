//! Typed repository for rating-and-review documents.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use lms_models::{CourseId, Rating, RatingAndReview, ReviewId, UserId};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    Aggregation, Document, Filter, FromStoreValue, Order, StructuredAggregationQuery,
    StructuredQuery, ToStoreValue, Value,
};

/// Collection holding review documents.
pub const COLLECTION: &str = "reviews";

/// Result of the course rating aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Mean rating over all reviews of the course; `None` when no reviews exist.
    pub average: Option<f64>,
    /// Number of reviews that entered the aggregation.
    pub count: u64,
}

/// Repository for rating-and-review documents.
#[derive(Clone)]
pub struct ReviewRepository {
    client: StoreClient,
}

impl ReviewRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Get a review by id.
    pub async fn get(&self, review_id: &ReviewId) -> StoreResult<Option<RatingAndReview>> {
        let doc = self.client.get_document(COLLECTION, review_id.as_str()).await?;

        match doc {
            Some(d) => Ok(Some(document_to_review(&d)?)),
            None => Ok(None),
        }
    }

    /// Create a new review document.
    pub async fn create(&self, review: &RatingAndReview) -> StoreResult<()> {
        let fields = review_to_fields(review);
        self.client
            .create_document(COLLECTION, review.review_id.as_str(), fields)
            .await?;
        info!(
            "Created review {} ({} stars) for course {} by user {}",
            review.review_id, review.rating, review.course, review.user
        );
        Ok(())
    }

    /// Find the review a user left on a course, if any.
    ///
    /// This existence check is the only uniqueness guarantee for the
    /// (user, course) pair; there is no storage-level constraint.
    pub async fn find_by_user_and_course(
        &self,
        user: &UserId,
        course: &CourseId,
    ) -> StoreResult<Option<RatingAndReview>> {
        let mut query = StructuredQuery::collection(COLLECTION);
        query.r#where = Some(Filter::and(vec![
            Filter::field("user", "EQUAL", Value::StringValue(user.0.clone())),
            Filter::field("course", "EQUAL", Value::StringValue(course.0.clone())),
        ]));
        query.limit = Some(1);

        let docs = self.client.run_query(None, query).await?;
        match docs.first() {
            Some(doc) => Ok(Some(document_to_review(doc)?)),
            None => Ok(None),
        }
    }

    /// List every review in the system, sorted by rating descending.
    pub async fn list_all_by_rating_desc(&self) -> StoreResult<Vec<RatingAndReview>> {
        let mut query = StructuredQuery::collection(COLLECTION);
        query.order_by = Some(vec![Order::desc("rating")]);

        let docs = self.client.run_query(None, query).await?;

        let mut reviews = Vec::with_capacity(docs.len());
        for doc in &docs {
            match document_to_review(doc) {
                Ok(review) => reviews.push(review),
                Err(e) => {
                    warn!(
                        doc_id = doc.doc_id().unwrap_or("?"),
                        error = %e,
                        "Skipping unparseable review document"
                    );
                }
            }
        }
        Ok(reviews)
    }

    /// Server-side mean rating over all reviews of a course.
    pub async fn average_for_course(&self, course: &CourseId) -> StoreResult<RatingSummary> {
        let mut query = StructuredQuery::collection(COLLECTION);
        query.r#where = Some(Filter::field(
            "course",
            "EQUAL",
            Value::StringValue(course.0.clone()),
        ));

        let aggregation = StructuredAggregationQuery {
            structured_query: query,
            aggregations: vec![
                Aggregation::avg("average_rating", "rating"),
                Aggregation::count("rating_count"),
            ],
        };

        let fields = self.client.run_aggregation_query(None, aggregation).await?;

        let count = fields
            .get("rating_count")
            .and_then(u64::from_store_value)
            .unwrap_or(0);
        let average = if count == 0 {
            None
        } else {
            fields.get("average_rating").and_then(f64::from_store_value)
        };

        Ok(RatingSummary { average, count })
    }
}

// =============================================================================
// Document conversion
// =============================================================================

pub(crate) fn review_to_fields(review: &RatingAndReview) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("review_id".to_string(), review.review_id.0.to_store_value());
    fields.insert("user".to_string(), review.user.0.to_store_value());
    fields.insert("course".to_string(), review.course.0.to_store_value());
    fields.insert("rating".to_string(), i64::from(review.rating).to_store_value());
    fields.insert("review".to_string(), review.review.to_store_value());
    fields.insert("created_at".to_string(), review.created_at.to_store_value());
    fields
}

pub(crate) fn document_to_review(doc: &Document) -> StoreResult<RatingAndReview> {
    let review_id = doc
        .field::<String>("review_id")
        .or_else(|| doc.doc_id().map(str::to_string))
        .ok_or_else(|| StoreError::invalid_response("review document missing id"))?;

    let missing = |name: &str| {
        StoreError::invalid_response(format!("review {} missing field {}", review_id, name))
    };

    let rating_raw = doc.field::<i64>("rating").ok_or_else(|| missing("rating"))?;
    let rating = Rating::new(rating_raw)
        .map_err(|e| StoreError::invalid_response(format!("review {}: {}", review_id, e)))?;

    Ok(RatingAndReview {
        review_id: ReviewId::from(review_id.clone()),
        user: UserId::from(doc.field::<String>("user").ok_or_else(|| missing("user"))?),
        course: CourseId::from(doc.field::<String>("course").ok_or_else(|| missing("course"))?),
        rating,
        review: doc.field("review").unwrap_or_default(),
        created_at: doc.field("created_at").unwrap_or_else(Utc::now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_review() -> RatingAndReview {
        RatingAndReview::new(
            UserId::from("u1"),
            CourseId::from("c1"),
            Rating::new(4).unwrap(),
            "Clear explanations, good pacing.",
        )
    }

    #[test]
    fn review_round_trips_through_fields() {
        let review = sample_review();
        let doc = Document::new(review_to_fields(&review));
        let parsed = document_to_review(&doc).unwrap();

        assert_eq!(parsed.review_id, review.review_id);
        assert_eq!(parsed.user, review.user);
        assert_eq!(parsed.course, review.course);
        assert_eq!(parsed.rating, review.rating);
        assert_eq!(parsed.review, review.review);
    }

    #[test]
    fn out_of_range_stored_rating_is_rejected() {
        let review = sample_review();
        let mut fields = review_to_fields(&review);
        fields.insert("rating".to_string(), 11i64.to_store_value());
        let doc = Document::new(fields);
        assert!(document_to_review(&doc).is_err());
    }
}
