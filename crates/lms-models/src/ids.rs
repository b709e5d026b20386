//! Identifier newtypes for store documents.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Create from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier for a course document.
    CourseId
);

string_id!(
    /// Unique identifier for a user profile document.
    UserId
);

string_id!(
    /// Unique identifier for a rating-and-review document.
    ReviewId
);

string_id!(
    /// Unique identifier for a category document.
    CategoryId
);

string_id!(
    /// Unique identifier for a persisted order.
    ///
    /// This is the local document id; the gateway's own order id is stored
    /// alongside it on the order.
    OrderId
);

string_id!(
    /// Identifier for a section embedded in a course.
    SectionId
);

string_id!(
    /// Identifier for a subsection embedded in a section.
    SubSectionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(CourseId::new(), CourseId::new());
    }

    #[test]
    fn id_round_trips_through_string() {
        let id = UserId::from_string("user-42");
        assert_eq!(id.as_str(), "user-42");
        assert_eq!(id.to_string(), "user-42");
        assert_eq!(UserId::from("user-42"), id);
    }

    #[test]
    fn id_serializes_transparently() {
        let id = ReviewId::from_string("rev-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rev-1\"");
    }
}
