//! Engine error types

use uuid::Uuid;

use super::FetchError;

/// Errors returned by the [`FeedEngine`](crate::FeedEngine),
/// [`ProfileLoader`](crate::ProfileLoader) and
/// [`CommentThread`](crate::CommentThread).
///
/// All of these are recoverable: the engine stays usable and the same call
/// can be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// A page fetch failed; items and cursor were left unchanged.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The post is not part of the loaded feed.
    #[error("Post {0} is not loaded")]
    UnknownPost(Uuid),

    /// The like mutation failed and the optimistic change was rolled back.
    #[error("Like on post {post_id} was rejected: {source}")]
    LikeRejected {
        /// The post whose like was toggled.
        post_id: Uuid,
        /// Underlying collaborator error.
        source: FetchError,
    },

    /// The follow mutation failed; nothing was changed locally.
    #[error("Follow of {email} was rejected: {source}")]
    FollowRejected {
        /// Email of the profile being followed or unfollowed.
        email: String,
        /// Underlying collaborator error.
        source: FetchError,
    },

    /// No user with this email exists.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The comment text is empty after trimming.
    #[error("Comment is empty")]
    EmptyComment,

    /// The comment was not stored; the thread was left unchanged.
    #[error("Comment on post {post_id} was rejected: {source}")]
    CommentRejected {
        /// The post being commented on.
        post_id: Uuid,
        /// Underlying collaborator error.
        source: FetchError,
    },
}

impl FeedError {
    /// Returns the underlying collaborator error, if any.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::LikeRejected { source, .. }
            | Self::FollowRejected { source, .. }
            | Self::CommentRejected { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        self.fetch_error().is_some_and(FetchError::is_retryable)
    }
}
