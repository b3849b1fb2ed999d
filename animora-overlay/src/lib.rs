//! Gesture-driven overlay navigation for Animora.
//!
//! Overlays (post details, liker lists, profiles, follower lists) open on top
//! of each other to any depth. The crate keeps one [`ModalStack`] of what is
//! open, gives every overlay its own [`TransitionAnimator`] and
//! [`DismissController`], and lets the [`OverlayComposer`] decide which kinds
//! may nest and in which order a subtree closes.
//!
//! All state transitions happen on the UI event loop. Time is passed in as
//! `Instant`s; nothing here sleeps or spawns.

pub mod composer;
pub mod error;
pub mod gesture;
pub mod kind;
pub mod stack;
pub mod transition;

pub use composer::{OverlayComposer, OverlayEvent, OverlayLayer};
pub use error::{OverlayError, StackError};
pub use gesture::{DismissController, DismissDecision, GestureConfig, GesturePhase, GestureSample};
pub use kind::{ConnectionTab, OverlayKind};
pub use stack::{ModalStack, OverlayHandle, OverlayKey, OverlayState};
pub use transition::{
    Easing, TransitionAnimator, TransitionCompletion, TransitionConfig, TransitionDirection,
    TransitionTicket,
};
