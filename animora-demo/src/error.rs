use animora_feed::{FeedError, FetchError};
use animora_overlay::OverlayError;

/// Anything that can abort the walkthrough.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("Overlay contract violated: {0}")]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Seed data: {0}")]
    Seed(#[from] FetchError),

    #[error("Log setup: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walkthrough step failed: {0}")]
    Step(String),
}

impl DemoError {
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step(message.into())
    }
}
