//! Error types

mod feed;
mod fetch;

pub use feed::*;
pub use fetch::*;
