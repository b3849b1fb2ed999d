//! Comments overlay data: the thread under one post and posting to it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::{FeedError, FetchError};
use crate::model::Comment;
use crate::notice::{Notice, NoticeQueue};
use crate::source::{CommentService, Session};

/// Load state of a comment thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommentsState {
    #[default]
    Idle,
    Loading,
    Ready(Vec<Comment>),
    Error(FetchError),
}

impl CommentsState {
    pub fn comments(&self) -> Option<&[Comment]> {
        match self {
            Self::Ready(comments) => Some(comments),
            _ => None,
        }
    }
}

/// Result of [`CommentThread::post_comment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// The service stored the comment and it was appended to the thread.
    Posted(Comment),
    /// Nothing was sent: no thread is loaded or a comment is already being posted.
    Skipped,
}

#[derive(Debug, Default)]
struct ThreadInner {
    post_id: Option<Uuid>,
    state: CommentsState,
    generation: u64,
    posting: bool,
}

/// Loads the comments of one post and posts new ones.
///
/// Posting is pessimistic, like following: a comment only shows up in the
/// thread once the service has returned it.
#[derive(Clone)]
pub struct CommentThread {
    service: Arc<dyn CommentService>,
    session: Arc<dyn Session>,
    notices: NoticeQueue,
    inner: Arc<Mutex<ThreadInner>>,
}

impl CommentThread {
    pub fn new(service: Arc<dyn CommentService>, session: Arc<dyn Session>) -> Self {
        Self {
            service,
            session,
            notices: NoticeQueue::new(),
            inner: Arc::new(Mutex::new(ThreadInner::default())),
        }
    }

    /// Routes notices into an existing queue shared with other components.
    pub fn with_notices(mut self, notices: NoticeQueue) -> Self {
        self.notices = notices;
        self
    }

    fn inner(&self) -> MutexGuard<'_, ThreadInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CommentsState {
        self.inner().state.clone()
    }

    pub fn post_id(&self) -> Option<Uuid> {
        self.inner().post_id
    }

    /// Loaded comments, oldest first. Empty until a load succeeds.
    pub fn comments(&self) -> Vec<Comment> {
        self.inner()
            .state
            .comments()
            .map(<[Comment]>::to_vec)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner().state.comments().map_or(0, <[Comment]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_posting(&self) -> bool {
        self.inner().posting
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Fetches the thread of `post_id`, replacing whatever was loaded.
    pub async fn load(&self, post_id: Uuid) -> Result<Vec<Comment>, FeedError> {
        let generation = {
            let mut inner = self.inner();
            inner.generation += 1;
            inner.post_id = Some(post_id);
            inner.state = CommentsState::Loading;
            inner.posting = false;
            inner.generation
        };

        log::debug!("loading comments of {}", post_id);
        let result = self.service.fetch_comments(post_id).await;

        let mut inner = self.inner();
        let current = inner.generation == generation;
        match result {
            Ok(comments) => {
                if current {
                    inner.state = CommentsState::Ready(comments.clone());
                }
                Ok(comments)
            }
            Err(err) => {
                if current {
                    inner.state = CommentsState::Error(err.clone());
                }
                drop(inner);
                log::warn!("loading comments of {} failed: {}", post_id, err);
                match err {
                    FetchError::NotFound(_) => Err(FeedError::UnknownPost(post_id)),
                    err => {
                        self.notices.push(Notice::warning("Couldn't load comments."));
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Re-fetches the current thread. Returns `Ok(None)` if none was loaded.
    pub async fn reload(&self) -> Result<Option<Vec<Comment>>, FeedError> {
        let Some(post_id) = self.post_id() else {
            return Ok(None);
        };
        self.load(post_id).await.map(Some)
    }

    /// Posts `content` as the signed-in user and appends it once stored.
    ///
    /// Surrounding whitespace is trimmed; blank content is refused with
    /// [`FeedError::EmptyComment`] before anything is sent.
    pub async fn post_comment(&self, content: &str) -> Result<CommentOutcome, FeedError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(FeedError::EmptyComment);
        }

        let (post_id, generation) = {
            let mut inner = self.inner();
            if inner.posting {
                return Ok(CommentOutcome::Skipped);
            }
            let (Some(post_id), CommentsState::Ready(_)) = (inner.post_id, &inner.state) else {
                return Ok(CommentOutcome::Skipped);
            };
            inner.posting = true;
            (post_id, inner.generation)
        };

        let me = self.session.current_user_id();
        log::debug!("posting comment on {}", post_id);
        let result = self.service.create_comment(post_id, me, content).await;

        let mut inner = self.inner();
        if inner.generation != generation {
            // Another thread was loaded meanwhile.
            return result
                .map(CommentOutcome::Posted)
                .map_err(|source| FeedError::CommentRejected { post_id, source });
        }
        inner.posting = false;

        match result {
            Ok(comment) => {
                if let CommentsState::Ready(comments) = &mut inner.state
                    && comments.iter().all(|c| c.id != comment.id)
                {
                    comments.push(comment.clone());
                }
                Ok(CommentOutcome::Posted(comment))
            }
            Err(source) => {
                drop(inner);
                log::warn!("comment on {} rejected: {}", post_id, source);
                self.notices.push(Notice::error("Couldn't post your comment."));
                Err(FeedError::CommentRejected { post_id, source })
            }
        }
    }
}
