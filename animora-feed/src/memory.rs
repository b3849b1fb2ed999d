//! In-memory implementation of every collaborator contract using DashMap

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::FetchError;
use crate::model::{Comment, Cursor, FeedPage, FeedResource, Post, User, UserSummary};
use crate::source::{CommentService, FeedSource, FollowService, LikeService, UserDirectory};

#[derive(Debug, Clone)]
struct PostRecord {
    id: Uuid,
    author: Uuid,
    caption: String,
    image_url: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seed {
    users: Vec<UserSummary>,
    #[serde(default)]
    posts: Vec<SeedPost>,
    #[serde(default)]
    follows: Vec<SeedEdge>,
    #[serde(default)]
    likes: Vec<SeedLike>,
    #[serde(default)]
    comments: Vec<SeedComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedPost {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    author: String,
    caption: String,
    #[serde(default)]
    image_url: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SeedEdge {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct SeedLike {
    post: Uuid,
    user: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedComment {
    post: Uuid,
    user: String,
    content: String,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

/// A self-contained social backend: users, posts, likes, comments and follows.
///
/// Posts are kept newest first. A page holding `limit` posts carries the id
/// of its last post as the cursor; a shorter page carries none.
///
/// Failures can be injected with [`fail_next_fetch`](Self::fail_next_fetch),
/// [`reject_likes`](Self::reject_likes), [`reject_follows`](Self::reject_follows)
/// and [`reject_comments`](Self::reject_comments). Every call can be slowed
/// down with [`set_latency`](Self::set_latency).
///
/// # Example
///
/// ```
/// use animora_feed::{MemoryBackend, UserSummary};
///
/// let backend = MemoryBackend::new();
/// let a = backend.add_user(UserSummary::new("a@example.com", "A"));
/// backend.add_post(a, "first post");
/// assert_eq!(backend.post_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    viewer: RwLock<Option<Uuid>>,
    users: DashMap<Uuid, UserSummary>,
    emails: DashMap<String, Uuid>,
    posts: RwLock<Vec<PostRecord>>,
    /// Post id to the users who liked it.
    likes: DashMap<Uuid, HashSet<Uuid>>,
    /// User id to the users they follow.
    follows: DashMap<Uuid, HashSet<Uuid>>,
    /// Post id to its comments, oldest first.
    comments: DashMap<Uuid, Vec<Comment>>,
    latency: Mutex<Duration>,
    fail_next_fetch: AtomicBool,
    reject_likes: AtomicBool,
    reject_follows: AtomicBool,
    reject_comments: AtomicBool,
    fetch_calls: AtomicUsize,
    like_calls: AtomicUsize,
    follow_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a backend from a JSON seed document.
    ///
    /// ```json
    /// {
    ///   "users": [{ "id": "…", "email": "a@example.com", "name": "A" }],
    ///   "posts": [{ "author": "a@example.com", "caption": "hi", "createdAt": "2025-01-01T09:00:00Z" }],
    ///   "follows": [{ "from": "b@example.com", "to": "a@example.com" }],
    ///   "likes": [{ "post": "…", "user": "b@example.com" }],
    ///   "comments": [{ "post": "…", "user": "b@example.com", "content": "cute!" }]
    /// }
    /// ```
    pub fn from_seed_json(json: &str) -> Result<Self, FetchError> {
        let seed: Seed = serde_json::from_str(json)?;
        let backend = Self::new();

        for user in seed.users {
            backend.add_user(user);
        }
        for post in seed.posts {
            let author = backend.user_id(&post.author)?;
            backend.insert_post(PostRecord {
                id: post.id,
                author,
                caption: post.caption,
                image_url: post.image_url,
                created_at: post.created_at,
            });
        }
        for edge in seed.follows {
            let from = backend.user_id(&edge.from)?;
            let to = backend.user_id(&edge.to)?;
            backend.follow(from, to);
        }
        for like in seed.likes {
            let user = backend.user_id(&like.user)?;
            backend.like(like.post, user);
        }
        for comment in seed.comments {
            let user = backend.user_id(&comment.user)?;
            backend.insert_comment(comment.post, user, comment.content, comment.created_at)?;
        }
        Ok(backend)
    }

    /// Sets whose likes `liked_by_current_user` reports and whose follows
    /// make up [`FeedResource::Follows`].
    pub fn set_viewer(&self, user_id: Uuid) {
        *self.viewer.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
    }

    fn viewer(&self) -> Option<Uuid> {
        *self.viewer.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a user and returns its id.
    pub fn add_user(&self, user: UserSummary) -> Uuid {
        let id = user.id;
        self.emails.insert(user.email.clone(), id);
        self.users.insert(id, user);
        id
    }

    pub fn user(&self, id: Uuid) -> Option<UserSummary> {
        self.users.get(&id).map(|u| u.value().clone())
    }

    /// Looks up a user id by email.
    pub fn user_id(&self, email: &str) -> Result<Uuid, FetchError> {
        self.emails
            .get(email)
            .map(|id| *id.value())
            .ok_or_else(|| FetchError::not_found(format!("user {}", email)))
    }

    /// Adds a post by `author` created now and returns its id.
    pub fn add_post(&self, author: Uuid, caption: impl Into<String>) -> Uuid {
        self.add_post_at(author, caption, Utc::now())
    }

    /// Adds a post with an explicit creation time and returns its id.
    pub fn add_post_at(
        &self,
        author: Uuid,
        caption: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.insert_post(PostRecord {
            id,
            author,
            caption: caption.into(),
            image_url: format!("https://img.animora.app/{}.jpg", id),
            created_at,
        });
        id
    }

    fn insert_post(&self, record: PostRecord) {
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        // Newest first; among equal timestamps the latest insert goes first.
        let at = posts.partition_point(|p| p.created_at > record.created_at);
        posts.insert(at, record);
    }

    pub fn post_count(&self) -> usize {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn post_exists(&self, post_id: Uuid) -> bool {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p.id == post_id)
    }

    /// Records that `from` follows `to`.
    pub fn follow(&self, from: Uuid, to: Uuid) {
        self.follows.entry(from).or_default().insert(to);
    }

    pub fn is_following(&self, from: Uuid, to: Uuid) -> bool {
        self.follows.get(&from).is_some_and(|set| set.contains(&to))
    }

    /// Records that `user` likes `post`.
    pub fn like(&self, post: Uuid, user: Uuid) {
        self.likes.entry(post).or_default().insert(user);
    }

    pub fn likes_of(&self, post: Uuid) -> usize {
        self.likes.get(&post).map_or(0, |set| set.len())
    }

    pub fn is_liked_by(&self, post: Uuid, user: Uuid) -> bool {
        self.likes.get(&post).is_some_and(|set| set.contains(&user))
    }

    /// Adds a comment by `user` on `post`, created now.
    pub fn add_comment(
        &self,
        post: Uuid,
        user: Uuid,
        content: impl Into<String>,
    ) -> Result<Comment, FetchError> {
        self.insert_comment(post, user, content.into(), Utc::now())
    }

    fn insert_comment(
        &self,
        post: Uuid,
        user: Uuid,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, FetchError> {
        if !self.post_exists(post) {
            return Err(FetchError::not_found(format!("post {}", post)));
        }
        let user = self
            .user(user)
            .ok_or_else(|| FetchError::not_found(format!("user {}", user)))?;
        let comment = Comment {
            id: Uuid::new_v4(),
            user,
            content,
            created_at,
        };
        let mut thread = self.comments.entry(post).or_default();
        let at = thread.partition_point(|c| c.created_at <= created_at);
        thread.insert(at, comment.clone());
        Ok(comment)
    }

    pub fn comments_of(&self, post: Uuid) -> usize {
        self.comments.get(&post).map_or(0, |thread| thread.len())
    }

    /// Users who liked `post`, sorted by name.
    pub fn likers(&self, post: Uuid) -> Vec<UserSummary> {
        let ids: Vec<Uuid> = self
            .likes
            .get(&post)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        self.summaries(ids)
    }

    /// Delays every collaborator call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Makes the next `paginated_fetch` fail with a 503.
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Makes every like mutation fail until turned off again.
    pub fn reject_likes(&self, reject: bool) {
        self.reject_likes.store(reject, Ordering::SeqCst);
    }

    /// Makes every follow mutation fail until turned off again.
    pub fn reject_follows(&self, reject: bool) {
        self.reject_follows.store(reject, Ordering::SeqCst);
    }

    /// Makes every comment creation fail until turned off again.
    pub fn reject_comments(&self, reject: bool) {
        self.reject_comments.store(reject, Ordering::SeqCst);
    }

    /// Number of `paginated_fetch` calls received.
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of like mutations received.
    pub fn like_count(&self) -> usize {
        self.like_calls.load(Ordering::SeqCst)
    }

    /// Number of follow mutations received.
    pub fn follow_count(&self) -> usize {
        self.follow_calls.load(Ordering::SeqCst)
    }

    /// Number of comment creations received.
    pub fn comment_count(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn summaries(&self, ids: impl IntoIterator<Item = Uuid>) -> Vec<UserSummary> {
        let mut list: Vec<UserSummary> = ids.into_iter().filter_map(|id| self.user(id)).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    fn to_post(&self, record: &PostRecord, viewer: Option<Uuid>) -> Option<Post> {
        let user = self.user(record.author)?;
        Some(Post {
            id: record.id,
            caption: record.caption.clone(),
            image_url: record.image_url.clone(),
            user,
            likes_count: self.likes_of(record.id),
            liked_by_current_user: viewer.is_some_and(|v| self.is_liked_by(record.id, v)),
            comments_count: self.comments_of(record.id),
            created_at: record.created_at,
        })
    }

    fn matches(&self, resource: &FeedResource, record: &PostRecord, viewer: Option<Uuid>) -> bool {
        match resource {
            FeedResource::Recommended => true,
            FeedResource::User(id) => record.author == *id,
            FeedResource::Follows => viewer.is_some_and(|v| self.is_following(v, record.author)),
        }
    }
}

#[async_trait]
impl FeedSource for MemoryBackend {
    async fn paginated_fetch(
        &self,
        resource: &FeedResource,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<FeedPage, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(FetchError::http(503, "feed temporarily unavailable"));
        }

        let after = cursor
            .map(|c| Uuid::parse_str(c.as_str()))
            .transpose()
            .map_err(|e| FetchError::http(400, format!("invalid cursor: {}", e)))?;

        let viewer = self.viewer();
        let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
        let start = match after {
            Some(id) => posts
                .iter()
                .position(|p| p.id == id)
                .map(|i| i + 1)
                .ok_or_else(|| FetchError::http(400, format!("unknown cursor: {}", id)))?,
            None => 0,
        };

        let items: Vec<Post> = posts[start..]
            .iter()
            .filter(|p| self.matches(resource, p, viewer))
            .filter_map(|p| self.to_post(p, viewer))
            .take(limit)
            .collect();

        let page = match items.last() {
            Some(last) if items.len() == limit => {
                let cursor = Cursor::new(last.id.to_string());
                FeedPage::new(items).with_next_cursor(cursor)
            }
            _ => FeedPage::new(items),
        };
        Ok(page)
    }
}

#[async_trait]
impl LikeService for MemoryBackend {
    async fn set_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        desired: bool,
    ) -> Result<(), FetchError> {
        self.like_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.reject_likes.load(Ordering::SeqCst) {
            return Err(FetchError::http(503, "like service unavailable"));
        }
        if !self.post_exists(post_id) {
            return Err(FetchError::not_found(format!("post {}", post_id)));
        }

        if desired {
            self.like(post_id, user_id);
        } else if let Some(mut set) = self.likes.get_mut(&post_id) {
            set.remove(&user_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn fetch_user_by_email(&self, email: &str) -> Result<User, FetchError> {
        self.delay().await;

        let id = self.user_id(email)?;
        let summary = self
            .user(id)
            .ok_or_else(|| FetchError::not_found(format!("user {}", email)))?;

        let follows = self.summaries(
            self.follows
                .get(&id)
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        );
        let follower_ids: Vec<Uuid> = self
            .follows
            .iter()
            .filter(|entry| entry.value().contains(&id))
            .map(|entry| *entry.key())
            .collect();
        let followers = self.summaries(follower_ids);

        Ok(User {
            summary,
            followers_count: followers.len(),
            follows_count: follows.len(),
            followers,
            follows,
        })
    }
}

#[async_trait]
impl FollowService for MemoryBackend {
    async fn set_follow(&self, from: Uuid, to: Uuid, desired: bool) -> Result<(), FetchError> {
        self.follow_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.reject_follows.load(Ordering::SeqCst) {
            return Err(FetchError::http(503, "follow service unavailable"));
        }
        if from == to {
            return Err(FetchError::http(400, "cannot follow yourself"));
        }
        if !self.users.contains_key(&to) {
            return Err(FetchError::not_found(format!("user {}", to)));
        }

        if desired {
            self.follow(from, to);
        } else if let Some(mut set) = self.follows.get_mut(&from) {
            set.remove(&to);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentService for MemoryBackend {
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<Comment>, FetchError> {
        self.delay().await;

        if !self.post_exists(post_id) {
            return Err(FetchError::not_found(format!("post {}", post_id)));
        }
        Ok(self
            .comments
            .get(&post_id)
            .map(|thread| thread.value().clone())
            .unwrap_or_default())
    }

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<Comment, FetchError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        if self.reject_comments.load(Ordering::SeqCst) {
            return Err(FetchError::http(503, "comment service unavailable"));
        }
        if content.trim().is_empty() {
            return Err(FetchError::http(400, "comment is empty"));
        }
        self.add_comment(post_id, user_id, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_with_posts(n: usize) -> (MemoryBackend, Vec<Uuid>) {
        let backend = MemoryBackend::new();
        let a = backend.add_user(UserSummary::new("a@example.com", "A"));
        let base = Utc::now();
        // Inserted oldest first, so ids end up reversed in the feed.
        let mut ids: Vec<Uuid> = (0..n)
            .map(|i| {
                let at = base + chrono::Duration::seconds(i as i64);
                backend.add_post_at(a, format!("post {}", i), at)
            })
            .collect();
        ids.reverse();
        (backend, ids)
    }

    #[tokio::test]
    async fn test_full_page_cursor_is_last_id() {
        let (backend, ids) = backend_with_posts(5);
        let page = backend
            .paginated_fetch(&FeedResource::Recommended, None, 2)
            .await
            .unwrap();

        let got: Vec<Uuid> = page.items().iter().map(|p| p.id).collect();
        assert_eq!(got, ids[..2]);
        assert_eq!(page.next_cursor(), Some(&Cursor::new(ids[1].to_string())));
    }

    #[tokio::test]
    async fn test_short_page_has_no_cursor() {
        let (backend, ids) = backend_with_posts(3);
        let cursor = Cursor::new(ids[1].to_string());
        let page = backend
            .paginated_fetch(&FeedResource::Recommended, Some(&cursor), 2)
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.items()[0].id, ids[2]);
        assert!(page.next_cursor().is_none());
    }

    #[tokio::test]
    async fn test_garbage_cursor_is_rejected() {
        let (backend, _) = backend_with_posts(1);
        let err = backend
            .paginated_fetch(&FeedResource::Recommended, Some(&Cursor::new("zzz")), 2)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_follows_feed_filters_by_viewer() {
        let backend = MemoryBackend::new();
        let a = backend.add_user(UserSummary::new("a@example.com", "A"));
        let b = backend.add_user(UserSummary::new("b@example.com", "B"));
        let c = backend.add_user(UserSummary::new("c@example.com", "C"));
        backend.add_post(b, "from b");
        backend.add_post(c, "from c");
        backend.follow(a, b);
        backend.set_viewer(a);

        let page = backend
            .paginated_fetch(&FeedResource::Follows, None, 10)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.items()[0].user.id, b);
    }

    #[tokio::test]
    async fn test_user_lists_followers() {
        let backend = MemoryBackend::new();
        let a = backend.add_user(UserSummary::new("a@example.com", "A"));
        let b = backend.add_user(UserSummary::new("b@example.com", "B"));
        backend.follow(a, b);

        let user = backend.fetch_user_by_email("b@example.com").await.unwrap();
        assert_eq!(user.followers_count, 1);
        assert_eq!(user.followers[0].id, a);
        assert_eq!(user.follows_count, 0);

        let err = backend.fetch_user_by_email("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[test]
    fn test_seed_json() {
        let json = r#"{
            "users": [
                { "id": "6f1c6a4e-2d7b-4c43-9d3a-1f0e4b8a9c11", "email": "a@example.com", "name": "A" },
                { "id": "0b7e3d7a-8f3e-4a9b-b1a4-7e2f0c9d5a22", "email": "b@example.com", "name": "B" }
            ],
            "posts": [
                { "id": "9d2f4c1b-3e5a-4b6c-8d7e-0f1a2b3c4d5e", "author": "a@example.com", "caption": "hi", "createdAt": "2025-01-01T09:00:00Z" }
            ],
            "follows": [{ "from": "b@example.com", "to": "a@example.com" }],
            "likes": [{ "post": "9d2f4c1b-3e5a-4b6c-8d7e-0f1a2b3c4d5e", "user": "b@example.com" }],
            "comments": [{ "post": "9d2f4c1b-3e5a-4b6c-8d7e-0f1a2b3c4d5e", "user": "b@example.com", "content": "cute!" }]
        }"#;

        let backend = MemoryBackend::from_seed_json(json).unwrap();
        let a = backend.user_id("a@example.com").unwrap();
        let b = backend.user_id("b@example.com").unwrap();
        assert_eq!(backend.post_count(), 1);
        assert!(backend.is_following(b, a));
        let post = Uuid::parse_str("9d2f4c1b-3e5a-4b6c-8d7e-0f1a2b3c4d5e").unwrap();
        assert!(backend.is_liked_by(post, b));
        assert_eq!(backend.comments_of(post), 1);
    }

    #[test]
    fn test_seed_with_unknown_author_fails() {
        let json = r#"{
            "users": [],
            "posts": [{ "author": "ghost@example.com", "caption": "boo", "createdAt": "2025-01-01T09:00:00Z" }]
        }"#;
        let err = MemoryBackend::from_seed_json(json).unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_comments_are_listed_oldest_first() {
        let backend = MemoryBackend::new();
        let a = backend.add_user(UserSummary::new("a@example.com", "A"));
        let b = backend.add_user(UserSummary::new("b@example.com", "B"));
        let post = backend.add_post(a, "nap");

        let base = Utc::now();
        backend
            .insert_comment(post, b, "second".into(), base + chrono::Duration::seconds(5))
            .unwrap();
        backend.insert_comment(post, a, "first".into(), base).unwrap();

        let thread = backend.fetch_comments(post).await.unwrap();
        let contents: Vec<&str> = thread.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);
        assert_eq!(thread[1].user.id, b);

        let page = backend
            .paginated_fetch(&FeedResource::Recommended, None, 10)
            .await
            .unwrap();
        assert_eq!(page.items()[0].comments_count, 2);
    }

    #[tokio::test]
    async fn test_comment_on_unknown_post() {
        let backend = MemoryBackend::new();
        let a = backend.add_user(UserSummary::new("a@example.com", "A"));

        let err = backend
            .create_comment(Uuid::new_v4(), a, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(backend.fetch_comments(Uuid::new_v4()).await.is_err());
        assert_eq!(backend.comment_count(), 1);
    }
}
