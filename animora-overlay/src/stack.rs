//! Modal stack registry.
//!
//! The registry is the single record of which overlays are open and which one
//! is on top. Every overlay controller holds a clone of the same
//! [`ModalStack`] and asks it whether it currently owns input.
//!
//! Entries are ordered by depth: the first push sits at depth 0 and every
//! push lands at `len()`. Pops always target the top, so the depths of the
//! remaining entries stay contiguous.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StackError;

/// Identifier of one overlay instance in the stack.
///
/// Keys are dotted paths of kind segments (`likers.profile.followers`). A
/// child's key is its parent's key plus one segment, so the key is scoped by
/// depth rather than by whatever entity the overlay displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayKey(String);

impl OverlayKey {
    const SEPARATOR: char = '.';

    /// Creates a key for an overlay opened directly from a screen.
    pub fn root(segment: &str) -> Self {
        Self(segment.to_string())
    }

    /// Derives the key of a child overlay opened from this one.
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}{}{}", self.0, Self::SEPARATOR, segment))
    }

    /// Nesting depth encoded in the key (0 for a root overlay).
    pub fn depth(&self) -> usize {
        self.0.matches(Self::SEPARATOR).count()
    }

    /// Key of the overlay this one was opened from, if any.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(Self::SEPARATOR)
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Last segment of the key.
    pub fn segment(&self) -> &str {
        self.0
            .rsplit_once(Self::SEPARATOR)
            .map_or(self.0.as_str(), |(_, last)| last)
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OverlayKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OverlayKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a registered overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    /// Not registered (never stored in the stack, reported for missing keys).
    #[default]
    Closed,
    /// Registered, open animation in flight.
    Opening,
    /// Fully open and interactive.
    Open,
    /// Close animation in flight. Terminal: the handle is popped next.
    Closing,
}

impl OverlayState {
    /// Returns `true` if the overlay is on screen in any form.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// One registered overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayHandle {
    /// Stack key, unique among registered handles.
    pub key: OverlayKey,
    /// Position in the stack at push time.
    pub depth: usize,
    /// Current lifecycle state.
    pub state: OverlayState,
}

#[derive(Debug, Default)]
struct StackInner {
    entries: Vec<OverlayHandle>,
}

impl StackInner {
    fn position(&self, key: &OverlayKey) -> Result<usize, StackError> {
        self.entries
            .iter()
            .position(|entry| &entry.key == key)
            .ok_or_else(|| StackError::NotFound(key.clone()))
    }

    fn top_key(&self) -> Option<OverlayKey> {
        self.entries.last().map(|entry| entry.key.clone())
    }

    fn ensure_top(&self, key: &OverlayKey) -> Result<usize, StackError> {
        let index = self.position(key)?;
        if index + 1 != self.entries.len() {
            return Err(StackError::NotTop {
                key: key.clone(),
                top: self.top_key(),
            });
        }
        Ok(index)
    }
}

/// Shared handle to the overlay stack.
///
/// Cheap to clone; all clones see the same stack. The stack is only ever
/// mutated from the UI event loop, the lock just makes the handle shareable.
#[derive(Debug, Clone, Default)]
pub struct ModalStack {
    inner: Arc<Mutex<StackInner>>,
}

impl ModalStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StackInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new overlay on top of the stack in the `Opening` state.
    pub fn push(&self, key: impl Into<OverlayKey>) -> Result<OverlayHandle, StackError> {
        let key = key.into();
        let mut inner = self.lock();

        if inner.entries.iter().any(|entry| entry.key == key) {
            return Err(StackError::DuplicateKey(key));
        }

        let handle = OverlayHandle {
            depth: inner.entries.len(),
            key,
            state: OverlayState::Opening,
        };
        log::debug!("stack push {} at depth {}", handle.key, handle.depth);
        inner.entries.push(handle.clone());
        Ok(handle)
    }

    /// Removes the top overlay.
    ///
    /// Fails with [`StackError::NotFound`] for unknown keys and
    /// [`StackError::NotTop`] for keys that are covered by another overlay.
    pub fn pop(&self, key: &OverlayKey) -> Result<OverlayHandle, StackError> {
        let mut inner = self.lock();
        let index = inner.ensure_top(key)?;
        let handle = inner.entries.remove(index);
        log::debug!("stack pop {} from depth {}", handle.key, handle.depth);
        Ok(handle)
    }

    /// Moves an `Opening` overlay to `Open`.
    ///
    /// Marking an already open overlay is a no-op; a closing overlay can never
    /// reopen.
    pub fn mark_open(&self, key: &OverlayKey) -> Result<(), StackError> {
        let mut inner = self.lock();
        let index = inner.position(key)?;
        let entry = &mut inner.entries[index];
        match entry.state {
            OverlayState::Opening => {
                entry.state = OverlayState::Open;
                log::debug!("stack {} is open", entry.key);
                Ok(())
            }
            OverlayState::Open => Ok(()),
            from => Err(StackError::InvalidTransition {
                key: key.clone(),
                from,
                to: OverlayState::Open,
            }),
        }
    }

    /// Moves the top overlay to `Closing`.
    pub fn begin_closing(&self, key: &OverlayKey) -> Result<(), StackError> {
        let mut inner = self.lock();
        let index = inner.ensure_top(key)?;
        let entry = &mut inner.entries[index];
        match entry.state {
            OverlayState::Opening | OverlayState::Open => {
                entry.state = OverlayState::Closing;
                log::debug!("stack {} is closing", entry.key);
                Ok(())
            }
            from => Err(StackError::InvalidTransition {
                key: key.clone(),
                from,
                to: OverlayState::Closing,
            }),
        }
    }

    /// Returns `true` iff `key` is the last entry of the stack.
    pub fn is_top(&self, key: &OverlayKey) -> bool {
        self.lock()
            .entries
            .last()
            .is_some_and(|entry| &entry.key == key)
    }

    /// Key of the top overlay, if any.
    pub fn top(&self) -> Option<OverlayKey> {
        self.lock().top_key()
    }

    /// Snapshot of the handle registered under `key`.
    pub fn get(&self, key: &OverlayKey) -> Option<OverlayHandle> {
        self.lock()
            .entries
            .iter()
            .find(|entry| &entry.key == key)
            .cloned()
    }

    /// State of `key`, `Closed` if it is not registered.
    pub fn state(&self, key: &OverlayKey) -> OverlayState {
        self.get(key).map_or(OverlayState::Closed, |handle| handle.state)
    }

    /// Returns `true` if `key` is registered.
    pub fn contains(&self, key: &OverlayKey) -> bool {
        self.lock().entries.iter().any(|entry| &entry.key == key)
    }

    /// Registered keys in depth order.
    pub fn keys(&self) -> Vec<OverlayKey> {
        self.lock()
            .entries
            .iter()
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Number of registered overlays.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if no overlay is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_paths_encode_depth() {
        let root = OverlayKey::root("likers");
        let profile = root.child("profile");
        let followers = profile.child("followers");

        assert_eq!(root.depth(), 0);
        assert_eq!(followers.depth(), 2);
        assert_eq!(followers.as_str(), "likers.profile.followers");
        assert_eq!(followers.segment(), "followers");
        assert_eq!(followers.parent(), Some(profile));
        assert_eq!(root.parent(), None);
        assert_eq!(root.segment(), "likers");
    }

    #[test]
    fn clones_share_state() {
        let stack = ModalStack::new();
        let other = stack.clone();
        stack.push("a").unwrap();
        assert!(other.is_top(&"a".into()));
        assert_eq!(other.len(), 1);
    }
}
