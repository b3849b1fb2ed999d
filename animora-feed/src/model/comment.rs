use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

/// A comment under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "id": "3a9d5b2c-7e1f-4c8a-9b6d-2e4f6a8c0b13",
            "user": {
                "id": "0b7e3d7a-8f3e-4a9b-b1a4-7e2f0c9d5a22",
                "email": "b@example.com",
                "name": "B"
            },
            "content": "so fluffy",
            "createdAt": "2025-01-01T09:30:00Z"
        }"#;

        let c: Comment = serde_json::from_str(json).unwrap();
        assert_eq!(c.content, "so fluffy");
        assert_eq!(c.user.name, "B");
    }
}
