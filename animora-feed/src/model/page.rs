use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Post;

/// Opaque continuation token handed out by the feed source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which list of posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedResource {
    /// Posts by users the viewer follows.
    #[default]
    Follows,
    /// Every post, newest first.
    Recommended,
    /// Posts by one user.
    User(Uuid),
}

impl fmt::Display for FeedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Follows => f.write_str("follows"),
            Self::Recommended => f.write_str("recommended"),
            Self::User(id) => write!(f, "user/{}", id),
        }
    }
}

/// One page returned by `paginated_fetch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    #[serde(rename = "posts")]
    items: Vec<Post>,
    #[serde(default)]
    next_cursor: Option<Cursor>,
}

impl FeedPage {
    /// Creates a page with no continuation.
    pub fn new(items: Vec<Post>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Sets the cursor for the following page.
    pub fn with_next_cursor(mut self, cursor: Cursor) -> Self {
        self.next_cursor = Some(cursor);
        self
    }

    pub fn items(&self) -> &[Post] {
        &self.items
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if another page may follow when `limit` items were
    /// requested.
    pub fn has_more(&self, limit: usize) -> bool {
        self.next_cursor.is_some() && self.items.len() >= limit
    }

    pub fn into_parts(self) -> (Vec<Post>, Option<Cursor>) {
        (self.items, self.next_cursor)
    }
}

/// Where the next `fetch_next` continues from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageCursor {
    /// Nothing loaded yet.
    #[default]
    Start,
    /// Continue after this cursor.
    After(Cursor),
    /// The last page has been loaded.
    Exhausted,
}

impl PageCursor {
    /// The cursor to send with the next request, or `None` when there is
    /// nothing left to fetch.
    pub fn request(&self) -> Option<Option<&Cursor>> {
        match self {
            Self::Start => Some(None),
            Self::After(cursor) => Some(Some(cursor)),
            Self::Exhausted => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Cursor state after receiving `page` for a request of `limit` items.
    pub fn after_page(page: &FeedPage, limit: usize) -> Self {
        match page.next_cursor() {
            Some(cursor) if page.has_more(limit) => Self::After(cursor.clone()),
            _ => Self::Exhausted,
        }
    }
}
