//! Collaborator contracts.
//!
//! The engine never talks to a network itself. Everything it needs from the
//! outside world comes through these traits, so a real HTTP client and the
//! in-memory [`MemoryBackend`](crate::MemoryBackend) are interchangeable.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::FetchError;
use crate::model::{Comment, Cursor, FeedPage, FeedResource, User, UserSummary};

/// Serves pages of posts.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches up to `limit` posts of `resource`, continuing after `cursor`
    /// (from the start when `None`).
    async fn paginated_fetch(
        &self,
        resource: &FeedResource,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<FeedPage, FetchError>;
}

/// Creates and deletes likes.
#[async_trait]
pub trait LikeService: Send + Sync {
    /// Makes `user_id`'s like on `post_id` match `desired`.
    async fn set_like(&self, post_id: Uuid, user_id: Uuid, desired: bool) -> Result<(), FetchError>;
}

/// Looks up full profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn fetch_user_by_email(&self, email: &str) -> Result<User, FetchError>;
}

/// Creates and deletes follow relations.
#[async_trait]
pub trait FollowService: Send + Sync {
    /// Makes `from` follow (or stop following) `to`.
    async fn set_follow(&self, from: Uuid, to: Uuid, desired: bool) -> Result<(), FetchError>;
}

/// Lists and creates comments under a post.
#[async_trait]
pub trait CommentService: Send + Sync {
    /// All comments on `post_id`, oldest first.
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, FetchError>;

    /// Stores a comment by `user_id` and returns it as the server recorded it.
    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, FetchError>;
}

/// Supplies the signed-in user and the opaque bearer credential.
pub trait Session: Send + Sync {
    fn current_user(&self) -> &UserSummary;

    /// Opaque credential forwarded to collaborators as-is.
    fn bearer(&self) -> &str;

    fn current_user_id(&self) -> Uuid {
        self.current_user().id
    }
}

/// A session with a fixed user and credential.
#[derive(Debug, Clone)]
pub struct StaticSession {
    user: UserSummary,
    bearer: String,
}

impl StaticSession {
    pub fn new(user: UserSummary, bearer: impl Into<String>) -> Self {
        Self {
            user,
            bearer: bearer.into(),
        }
    }
}

impl Session for StaticSession {
    fn current_user(&self) -> &UserSummary {
        &self.user
    }

    fn bearer(&self) -> &str {
        &self.bearer
    }
}
