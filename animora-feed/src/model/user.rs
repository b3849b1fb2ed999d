use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The short form of a user embedded in posts, likes and follower lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub icon_image_url: Option<String>,
}

impl UserSummary {
    /// Creates a summary with a fresh id and empty bio.
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            bio: String::new(),
            icon_image_url: None,
        }
    }

    /// Sets the bio.
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }
}

/// A full profile as shown in a profile overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub summary: UserSummary,
    #[serde(default)]
    pub followers: Vec<UserSummary>,
    #[serde(default)]
    pub follows: Vec<UserSummary>,
    #[serde(default)]
    pub followers_count: usize,
    #[serde(default)]
    pub follows_count: usize,
}

impl User {
    pub fn id(&self) -> Uuid {
        self.summary.id
    }

    pub fn email(&self) -> &str {
        &self.summary.email
    }

    /// Returns `true` if `user_id` is among this user's followers.
    pub fn is_followed_by(&self, user_id: Uuid) -> bool {
        self.followers.iter().any(|f| f.id == user_id)
    }

    /// Adds `follower` unless already present and bumps the count.
    pub(crate) fn add_follower(&mut self, follower: UserSummary) {
        if !self.is_followed_by(follower.id) {
            self.followers.push(follower);
            self.followers_count += 1;
        }
    }

    /// Removes `user_id` from the followers and lowers the count.
    pub(crate) fn remove_follower(&mut self, user_id: Uuid) {
        let before = self.followers.len();
        self.followers.retain(|f| f.id != user_id);
        if self.followers.len() < before {
            self.followers_count = self.followers_count.saturating_sub(1);
        }
    }
}
