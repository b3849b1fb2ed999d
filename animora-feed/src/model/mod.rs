//! Feed data model

mod comment;
mod page;
mod post;
mod user;

pub use comment::*;
pub use page::*;
pub use post::*;
pub use user::*;
