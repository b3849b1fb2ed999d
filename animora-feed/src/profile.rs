//! Profile overlay data: the user behind an email and follow toggling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{FeedError, FetchError};
use crate::model::User;
use crate::notice::{Notice, NoticeQueue};
use crate::source::{FollowService, Session, UserDirectory};

/// Load state of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProfileState {
    #[default]
    Idle,
    Loading,
    Ready(User),
    Error(FetchError),
}

impl ProfileState {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Ready(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Result of [`ProfileLoader::toggle_follow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The service confirmed; the viewer now follows (or not).
    Applied { following: bool },
    /// Nothing to do: no profile loaded, it is the viewer's own, or a toggle
    /// is already pending.
    Skipped,
}

#[derive(Debug, Default)]
struct ProfileInner {
    email: Option<String>,
    state: ProfileState,
    generation: u64,
    follow_pending: bool,
}

/// Loads one profile by email and toggles following it.
///
/// Unlike likes, follows are applied pessimistically: the follower list only
/// changes once the follow service has confirmed.
#[derive(Clone)]
pub struct ProfileLoader {
    directory: Arc<dyn UserDirectory>,
    follows: Arc<dyn FollowService>,
    session: Arc<dyn Session>,
    notices: NoticeQueue,
    inner: Arc<Mutex<ProfileInner>>,
}

impl ProfileLoader {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        follows: Arc<dyn FollowService>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            directory,
            follows,
            session,
            notices: NoticeQueue::new(),
            inner: Arc::new(Mutex::new(ProfileInner::default())),
        }
    }

    /// Routes notices into an existing queue shared with other components.
    pub fn with_notices(mut self, notices: NoticeQueue) -> Self {
        self.notices = notices;
        self
    }

    fn inner(&self) -> MutexGuard<'_, ProfileInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ProfileState {
        self.inner().state.clone()
    }

    pub fn email(&self) -> Option<String> {
        self.inner().email.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner().state.user().cloned()
    }

    /// Returns `true` if the loaded profile is the signed-in user.
    pub fn is_me(&self) -> bool {
        let me = self.session.current_user_id();
        self.inner().state.user().is_some_and(|u| u.id() == me)
    }

    /// Returns `true` if the signed-in user follows the loaded profile.
    pub fn is_following(&self) -> bool {
        let me = self.session.current_user_id();
        self.inner()
            .state
            .user()
            .is_some_and(|u| u.is_followed_by(me))
    }

    pub fn is_follow_pending(&self) -> bool {
        self.inner().follow_pending
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Fetches the profile for `email`, replacing whatever was loaded.
    pub async fn load(&self, email: &str) -> Result<User, FeedError> {
        let generation = {
            let mut inner = self.inner();
            inner.generation += 1;
            inner.email = Some(email.to_string());
            inner.state = ProfileState::Loading;
            inner.follow_pending = false;
            inner.generation
        };

        log::debug!("loading profile {}", email);
        let result = self.directory.fetch_user_by_email(email).await;

        let mut inner = self.inner();
        let current = inner.generation == generation;
        match result {
            Ok(user) => {
                if current {
                    inner.state = ProfileState::Ready(user.clone());
                }
                Ok(user)
            }
            Err(err) => {
                if current {
                    inner.state = ProfileState::Error(err.clone());
                }
                drop(inner);
                log::warn!("loading profile {} failed: {}", email, err);
                match err {
                    FetchError::NotFound(_) => Err(FeedError::UnknownUser(email.to_string())),
                    err => {
                        self.notices.push(Notice::warning("Couldn't load this profile."));
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Re-fetches the current profile. Returns `Ok(None)` if none was loaded.
    pub async fn reload(&self) -> Result<Option<User>, FeedError> {
        let Some(email) = self.email() else {
            return Ok(None);
        };
        self.load(&email).await.map(Some)
    }

    /// Follows or unfollows the loaded profile.
    pub async fn toggle_follow(&self) -> Result<FollowOutcome, FeedError> {
        let me = self.session.current_user().clone();
        let (target, email, desired, generation) = {
            let mut inner = self.inner();
            if inner.follow_pending {
                return Ok(FollowOutcome::Skipped);
            }
            let Some(user) = inner.state.user() else {
                return Ok(FollowOutcome::Skipped);
            };
            if user.id() == me.id {
                return Ok(FollowOutcome::Skipped);
            }
            let (target, email, desired) =
                (user.id(), user.email().to_string(), !user.is_followed_by(me.id));
            inner.follow_pending = true;
            (target, email, desired, inner.generation)
        };

        log::debug!("set follow on {} to {}", email, desired);
        let result = self.follows.set_follow(me.id, target, desired).await;

        let mut inner = self.inner();
        if inner.generation != generation {
            // Another profile was loaded meanwhile; it has its own state.
            return result
                .map(|()| FollowOutcome::Applied { following: desired })
                .map_err(|source| FeedError::FollowRejected { email, source });
        }
        inner.follow_pending = false;

        match result {
            Ok(()) => {
                if let ProfileState::Ready(user) = &mut inner.state {
                    if desired {
                        user.add_follower(me);
                    } else {
                        user.remove_follower(me.id);
                    }
                }
                Ok(FollowOutcome::Applied { following: desired })
            }
            Err(source) => {
                drop(inner);
                log::warn!("follow on {} rejected: {}", email, source);
                self.notices.push(Notice::error(if desired {
                    "Couldn't follow this user."
                } else {
                    "Couldn't unfollow this user."
                }));
                Err(FeedError::FollowRejected { email, source })
            }
        }
    }
}
