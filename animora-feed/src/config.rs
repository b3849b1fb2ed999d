//! Feed configuration

use crate::model::FeedResource;

/// Configuration for a [`FeedEngine`](crate::FeedEngine).
///
/// # Example
///
/// ```
/// use animora_feed::{FeedConfig, FeedResource};
///
/// let config = FeedConfig::default()
///     .with_page_size(20)
///     .with_resource(FeedResource::Recommended);
/// assert_eq!(config.page_size, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Items requested per page.
    ///
    /// Default: 10
    pub page_size: usize,

    /// Which list the engine pages through.
    ///
    /// Default: [`FeedResource::Follows`]
    pub resource: FeedResource,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            resource: FeedResource::Follows,
        }
    }
}

impl FeedConfig {
    /// Creates a new feed config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the resource to page through.
    pub fn with_resource(mut self, resource: FeedResource) -> Self {
        self.resource = resource;
        self
    }
}
