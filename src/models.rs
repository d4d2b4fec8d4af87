//! Typed Stack Exchange records
//!
//! The API documents almost nothing about nullability, so every field that
//! has been observed missing in the wild is an `Option`. Unknown fields are
//! kept via `#[serde(flatten)]` so they survive into the warehouse tables
//! unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope around every Stack Exchange API response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// The records; absent on malformed responses
    pub items: Option<Vec<Value>>,

    /// Whether further pages exist
    #[serde(default)]
    pub has_more: bool,

    /// Remaining request quota for this key/IP
    pub quota_remaining: Option<i64>,

    /// Seconds the client must wait before hitting this method again
    pub backoff: Option<u64>,

    /// Error fields, set when the API rejects the request
    pub error_id: Option<i64>,
    pub error_message: Option<String>,
}

/// A tag with its usage frequency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub name: String,
    pub count: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A shallow user reference as embedded in answers and questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShallowUser {
    /// Absent for deleted users
    pub user_id: Option<i64>,
    pub display_name: Option<String>,
    pub reputation: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An answer to a question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub answer_id: i64,
    pub question_id: Option<i64>,
    pub score: Option<i64>,
    pub is_accepted: Option<bool>,
    /// Unix epoch seconds
    pub creation_date: Option<i64>,
    pub owner: Option<ShallowUser>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question_id: i64,
    pub title: Option<String>,
    pub view_count: Option<i64>,
    pub is_answered: Option<bool>,
    pub answer_count: Option<i64>,
    /// Unix epoch seconds
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Round-trip raw items through the typed model for a known endpoint.
///
/// Validates that each record matches the expected shape and normalizes it
/// back to JSON for table loading. Unknown endpoints pass through untouched.
pub fn normalize(endpoint: &str, items: Vec<Value>) -> crate::error::Result<Vec<Value>> {
    match endpoint {
        "tags" => roundtrip::<Tag>(items),
        "answers" => roundtrip::<Answer>(items),
        "questions" => roundtrip::<Question>(items),
        _ => Ok(items),
    }
}

fn roundtrip<T>(items: Vec<Value>) -> crate::error::Result<Vec<Value>>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    items
        .into_iter()
        .map(|item| {
            let typed: T = serde_json::from_value(item)?;
            Ok(serde_json::to_value(typed)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_deserialization() {
        let tag: Tag = serde_json::from_value(json!({
            "name": "rust",
            "count": 400_000,
            "has_synonyms": true
        }))
        .unwrap();

        assert_eq!(tag.name, "rust");
        assert_eq!(tag.count, 400_000);
        assert_eq!(tag.extra["has_synonyms"], json!(true));
    }

    #[test]
    fn test_answer_with_deleted_owner() {
        let answer: Answer = serde_json::from_value(json!({
            "answer_id": 42,
            "question_id": 7,
            "score": 13,
            "is_accepted": true,
            "creation_date": 1_700_000_000i64,
            "owner": { "display_name": "user123" }
        }))
        .unwrap();

        assert_eq!(answer.answer_id, 42);
        assert_eq!(answer.score, Some(13));
        let owner = answer.owner.unwrap();
        assert_eq!(owner.user_id, None);
        assert_eq!(owner.display_name.as_deref(), Some("user123"));
    }

    #[test]
    fn test_question_defaults() {
        let question: Question = serde_json::from_value(json!({
            "question_id": 1,
            "title": "How do I exit vim?",
            "view_count": 3_000_000,
            "is_answered": true
        }))
        .unwrap();

        assert_eq!(question.question_id, 1);
        assert!(question.tags.is_empty());
        assert_eq!(question.creation_date, None);
    }

    #[test]
    fn test_api_response_error_fields() {
        let resp: ApiResponse = serde_json::from_value(json!({
            "error_id": 400,
            "error_message": "site is required",
            "error_name": "bad_parameter"
        }))
        .unwrap();

        assert!(resp.items.is_none());
        assert!(!resp.has_more);
        assert_eq!(resp.error_id, Some(400));
    }

    #[test]
    fn test_normalize_rejects_malformed_tag() {
        let items = vec![json!({"count": 3})]; // no name
        assert!(normalize("tags", items).is_err());
    }

    #[test]
    fn test_normalize_preserves_unknown_fields() {
        let items = vec![json!({
            "question_id": 9,
            "title": "t",
            "view_count": 1,
            "is_answered": false,
            "closed_reason": "duplicate"
        })];
        let normalized = normalize("questions", items).unwrap();
        assert_eq!(normalized[0]["closed_reason"], json!("duplicate"));
    }

    #[test]
    fn test_normalize_passthrough_for_unknown_endpoint() {
        let items = vec![json!({"anything": 1})];
        let normalized = normalize("badges", items.clone()).unwrap();
        assert_eq!(normalized, items);
    }
}
