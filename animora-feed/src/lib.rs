//! Feed pagination, optimistic likes, profiles and comments for Animora.
//!
//! The engines in this crate own client-side state only. Data comes from the
//! collaborator traits in [`source`]; [`MemoryBackend`] implements all of them
//! in memory.

pub mod comments;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod notice;
pub mod pager;
pub mod profile;
pub mod source;

pub use comments::{CommentOutcome, CommentThread, CommentsState};
pub use config::FeedConfig;
pub use error::{FeedError, FetchError};
pub use memory::MemoryBackend;
pub use model::{
    Comment, Cursor, FeedPage, FeedResource, LikeState, PageCursor, Post, User, UserSummary,
};
pub use notice::{Notice, NoticeLevel, NoticeQueue};
pub use pager::{FeedEngine, FetchOutcome, LikeOutcome};
pub use profile::{FollowOutcome, ProfileLoader, ProfileState};
pub use source::{
    CommentService, FeedSource, FollowService, LikeService, Session, StaticSession, UserDirectory,
};
