//! Rating-and-review models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{CourseId, ReviewId, UserId};

/// Error returned for ratings outside the accepted range.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingError(pub i64);

/// Star rating, always in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Validate and construct a rating.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RatingError(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> i64 {
        rating.0 as i64
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A student's rating and review of a course.
///
/// At most one exists per (user, course) pair; the store layer enforces this
/// with an existence check before insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingAndReview {
    /// Unique review ID
    pub review_id: ReviewId,

    /// Reviewing user
    pub user: UserId,

    /// Reviewed course
    pub course: CourseId,

    /// Star rating
    pub rating: Rating,

    /// Free-text review body
    pub review: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl RatingAndReview {
    /// Create a new review for a (user, course) pair.
    pub fn new(user: UserId, course: CourseId, rating: Rating, review: impl Into<String>) -> Self {
        Self {
            review_id: ReviewId::new(),
            user,
            course,
            rating,
            review: review.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_accepts_full_star_range() {
        for value in 1..=5 {
            assert_eq!(Rating::new(value).unwrap().value(), value as u8);
        }
    }

    #[test]
    fn rating_rejects_out_of_range() {
        assert_eq!(Rating::new(0), Err(RatingError(0)));
        assert_eq!(Rating::new(6), Err(RatingError(6)));
        assert_eq!(Rating::new(-3), Err(RatingError(-3)));
    }

    #[test]
    fn rating_deserializes_from_integer() {
        let rating: Rating = serde_json::from_str("4").unwrap();
        assert_eq!(rating.value(), 4);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn review_keeps_user_and_course_refs() {
        let review = RatingAndReview::new(
            UserId::from("u1"),
            CourseId::from("c1"),
            Rating::new(5).unwrap(),
            "excellent",
        );
        assert_eq!(review.user.as_str(), "u1");
        assert_eq!(review.course.as_str(), "c1");
        assert_eq!(review.rating.value(), 5);
    }
}
