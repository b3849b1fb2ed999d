//! Error types for the overlay stack and composer.

use crate::stack::{OverlayKey, OverlayState};

/// Contract violations reported by the [`ModalStack`](crate::ModalStack).
///
/// These never describe a runtime condition the UI can recover from. They mean
/// a push/pop pair went out of step somewhere in the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// A key was pushed while another handle with the same key is registered.
    #[error("overlay key already registered: {0}")]
    DuplicateKey(OverlayKey),

    /// The key is not registered.
    #[error("overlay key not registered: {0}")]
    NotFound(OverlayKey),

    /// The operation is only valid for the top of the stack.
    #[error("overlay {key} is not on top (top is {top:?})")]
    NotTop {
        /// The key the caller targeted.
        key: OverlayKey,
        /// The actual top at the time of the call.
        top: Option<OverlayKey>,
    },

    /// The handle cannot move between these states.
    #[error("overlay {key} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        /// The handle's key.
        key: OverlayKey,
        /// Current state.
        from: OverlayState,
        /// Requested state.
        to: OverlayState,
    },
}

impl StackError {
    /// Returns the key the failed operation targeted.
    pub fn key(&self) -> &OverlayKey {
        match self {
            Self::DuplicateKey(key) | Self::NotFound(key) => key,
            Self::NotTop { key, .. } | Self::InvalidTransition { key, .. } => key,
        }
    }
}

/// Errors returned by the [`OverlayComposer`](crate::OverlayComposer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    /// The registry rejected a push/pop/transition.
    #[error(transparent)]
    Stack(#[from] StackError),

    /// The parent kind cannot host the requested child kind.
    #[error("{parent} overlays cannot open {child} overlays")]
    UnsupportedNesting {
        /// Segment name of the parent kind.
        parent: &'static str,
        /// Segment name of the requested child kind.
        child: &'static str,
    },

    /// Children can only be opened from the top overlay while it is not closing.
    #[error("overlay {0} cannot open children right now")]
    ParentNotActive(OverlayKey),

    /// A cascade close is running; the stack is frozen until it finishes.
    #[error("a cascade close is in progress")]
    CascadeInProgress,

    /// The composer holds no overlay with this key.
    #[error("no overlay with key {0}")]
    UnknownOverlay(OverlayKey),
}

impl OverlayError {
    /// Returns `true` if this wraps a registry contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Stack(_))
    }
}
