//! Cursor-paginated feed with optimistic likes.
//!
//! [`FeedEngine`] is a cheap-to-clone handle: every clone sees the same
//! items, cursor and in-flight flags. The internal lock is only held for
//! bookkeeping and never across an `.await`, so a slow fetch does not block
//! like toggles or reads from the UI.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::config::FeedConfig;
use crate::error::{FeedError, FetchError};
use crate::model::{Cursor, FeedPage, LikeState, PageCursor, Post};
use crate::notice::{Notice, NoticeQueue};
use crate::source::{FeedSource, LikeService, Session};

/// Result of a [`FeedEngine::fetch_next`] or [`FeedEngine::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was applied.
    Loaded {
        /// Items added to the feed (duplicates are not counted).
        appended: usize,
        /// No further page will be requested.
        exhausted: bool,
    },
    /// Nothing was requested: the feed is exhausted or a fetch is in flight.
    Skipped,
    /// A refresh started while this fetch was in flight; its page was dropped.
    Discarded,
}

/// Result of a [`FeedEngine::toggle_like`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The collaborator confirmed the new state.
    Applied { liked: bool },
    /// A toggle for this post was already pending.
    Skipped,
}

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<Post>,
    cursor: PageCursor,
    /// Generation of the in-flight `fetch_next`, if any.
    next_in_flight: Option<u64>,
    refreshing: bool,
    generation: u64,
    pending_likes: HashSet<Uuid>,
}

impl FeedState {
    fn post_mut(&mut self, post_id: Uuid) -> Option<&mut Post> {
        self.items.iter_mut().find(|p| p.id == post_id)
    }

    /// Appends unseen items in response order and returns how many were added.
    fn append(&mut self, items: Vec<Post>) -> usize {
        let mut seen: HashSet<Uuid> = self.items.iter().map(|p| p.id).collect();
        let before = self.items.len();
        self.items
            .extend(items.into_iter().filter(|p| seen.insert(p.id)));
        self.items.len() - before
    }
}

/// Paginated feed state plus per-post like toggling.
#[derive(Clone)]
pub struct FeedEngine {
    source: Arc<dyn FeedSource>,
    likes: Arc<dyn LikeService>,
    session: Arc<dyn Session>,
    config: FeedConfig,
    notices: NoticeQueue,
    state: Arc<Mutex<FeedState>>,
}

impl std::fmt::Debug for FeedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl FeedEngine {
    /// Creates an empty engine. Nothing is fetched until
    /// [`fetch_next`](Self::fetch_next) or [`refresh`](Self::refresh).
    pub fn new(
        source: Arc<dyn FeedSource>,
        likes: Arc<dyn LikeService>,
        session: Arc<dyn Session>,
        config: FeedConfig,
    ) -> Self {
        Self {
            source,
            likes,
            session,
            config,
            notices: NoticeQueue::new(),
            state: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    /// Routes notices into an existing queue shared with other components.
    pub fn with_notices(mut self, notices: NoticeQueue) -> Self {
        self.notices = notices;
        self
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Snapshot of the loaded posts in display order.
    pub fn items(&self) -> Vec<Post> {
        self.state().items.clone()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.state().items.iter().find(|p| p.id == post_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn cursor(&self) -> PageCursor {
        self.state().cursor.clone()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state().cursor.is_exhausted()
    }

    pub fn is_fetching_next(&self) -> bool {
        self.state().next_in_flight.is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.state().refreshing
    }

    pub fn like_state(&self, post_id: Uuid) -> Option<LikeState> {
        let state = self.state();
        let post = state.items.iter().find(|p| p.id == post_id)?;
        Some(LikeState {
            post_id,
            liked_by_current_user: post.liked_by_current_user,
            pending: state.pending_likes.contains(&post_id),
        })
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    /// Drains the queued notices, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    async fn request(&self, cursor: Option<Cursor>) -> Result<FeedPage, FetchError> {
        self.source
            .paginated_fetch(&self.config.resource, cursor.as_ref(), self.config.page_size)
            .await
    }

    /// Loads the page after the current cursor and appends it.
    ///
    /// A no-op while a fetch or refresh is in flight and once the feed is
    /// exhausted. On failure items and cursor are left unchanged, so the
    /// same call can be retried.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, FeedError> {
        let (cursor, generation) = {
            let mut state = self.state();
            if state.next_in_flight.is_some() || state.refreshing {
                return Ok(FetchOutcome::Skipped);
            }
            let Some(cursor) = state.cursor.request().map(|c| c.cloned()) else {
                return Ok(FetchOutcome::Skipped);
            };
            let generation = state.generation;
            state.next_in_flight = Some(generation);
            (cursor, generation)
        };

        log::debug!(
            "fetching {} after {:?} (limit {})",
            self.config.resource,
            cursor,
            self.config.page_size
        );
        let result = self.request(cursor).await;

        let mut state = self.state();
        if state.generation != generation {
            log::debug!("dropping stale page for {}", self.config.resource);
            return Ok(FetchOutcome::Discarded);
        }
        state.next_in_flight = None;

        match result {
            Ok(page) => {
                let next = PageCursor::after_page(&page, self.config.page_size);
                let (items, _) = page.into_parts();
                let appended = state.append(items);
                let exhausted = next.is_exhausted();
                state.cursor = next;
                log::debug!(
                    "appended {} posts ({} total, exhausted: {})",
                    appended,
                    state.items.len(),
                    exhausted
                );
                Ok(FetchOutcome::Loaded {
                    appended,
                    exhausted,
                })
            }
            Err(err) => {
                drop(state);
                log::warn!("fetching {} failed: {}", self.config.resource, err);
                self.notices
                    .push(Notice::warning("Couldn't load more posts. Pull to retry."));
                Err(err.into())
            }
        }
    }

    /// Reloads the feed from the start, replacing the current items.
    ///
    /// A `fetch_next` in flight when the refresh starts has its page
    /// discarded. On failure the current items and cursor stay in place.
    pub async fn refresh(&self) -> Result<FetchOutcome, FeedError> {
        let generation = {
            let mut state = self.state();
            if state.refreshing {
                return Ok(FetchOutcome::Skipped);
            }
            state.refreshing = true;
            state.generation += 1;
            state.next_in_flight = None;
            state.generation
        };

        log::debug!("refreshing {} (generation {})", self.config.resource, generation);
        let result = self.request(None).await;

        let mut state = self.state();
        state.refreshing = false;

        match result {
            Ok(page) => {
                let next = PageCursor::after_page(&page, self.config.page_size);
                let (items, _) = page.into_parts();
                state.items.clear();
                let appended = state.append(items);
                let exhausted = next.is_exhausted();
                state.cursor = next;
                log::debug!("refreshed {} with {} posts", self.config.resource, appended);
                Ok(FetchOutcome::Loaded {
                    appended,
                    exhausted,
                })
            }
            Err(err) => {
                drop(state);
                log::warn!("refreshing {} failed: {}", self.config.resource, err);
                self.notices
                    .push(Notice::warning("Couldn't refresh. Showing saved posts."));
                Err(err.into())
            }
        }
    }

    /// Flips the viewer's like on `post_id`.
    ///
    /// The local state changes immediately; the mutation is then sent to the
    /// like service. While it is pending, further toggles of the same post
    /// are ignored. If the service rejects it, the flag and count are
    /// restored and [`FeedError::LikeRejected`] is returned.
    pub async fn toggle_like(&self, post_id: Uuid) -> Result<LikeOutcome, FeedError> {
        let desired = {
            let mut state = self.state();
            if state.pending_likes.contains(&post_id) {
                log::debug!("like on {} already pending", post_id);
                return Ok(LikeOutcome::Skipped);
            }
            let post = state
                .post_mut(post_id)
                .ok_or(FeedError::UnknownPost(post_id))?;
            let desired = !post.liked_by_current_user;
            post.apply_like(desired);
            state.pending_likes.insert(post_id);
            desired
        };

        let user_id = self.session.current_user_id();
        log::debug!("set like on {} to {}", post_id, desired);
        let result = self.likes.set_like(post_id, user_id, desired).await;

        let mut state = self.state();
        state.pending_likes.remove(&post_id);

        match result {
            Ok(()) => {
                // A refresh may have replaced the post with a pre-toggle copy.
                if let Some(post) = state
                    .post_mut(post_id)
                    .filter(|p| p.liked_by_current_user != desired)
                {
                    post.apply_like(desired);
                }
                Ok(LikeOutcome::Applied { liked: desired })
            }
            Err(source) => {
                // The post may have been dropped by a refresh meanwhile.
                if let Some(post) = state
                    .post_mut(post_id)
                    .filter(|p| p.liked_by_current_user == desired)
                {
                    post.apply_like(!desired);
                }
                drop(state);
                log::warn!("like on {} rejected: {}", post_id, source);
                self.notices.push(Notice::error(if desired {
                    "Couldn't like this post."
                } else {
                    "Couldn't remove your like."
                }));
                Err(FeedError::LikeRejected { post_id, source })
            }
        }
    }
}
