use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

/// A post as delivered in a feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub caption: String,
    pub image_url: String,
    pub user: UserSummary,
    pub likes_count: usize,
    #[serde(default)]
    pub liked_by_current_user: bool,
    #[serde(default)]
    pub comments_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Sets the viewer's like flag, adjusting the count when it changes.
    pub fn apply_like(&mut self, liked: bool) {
        if self.liked_by_current_user == liked {
            return;
        }
        self.liked_by_current_user = liked;
        if liked {
            self.likes_count += 1;
        } else {
            self.likes_count = self.likes_count.saturating_sub(1);
        }
    }
}

/// Transient like status of one post as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub post_id: Uuid,
    pub liked_by_current_user: bool,
    /// A mutation for this post is in flight.
    pub pending: bool,
}
