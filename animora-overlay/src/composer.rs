//! Recursive overlay composition.
//!
//! The composer owns every open overlay as a flat list indexed by depth. An
//! overlay never owns its children; opening a profile from a follower list
//! from a profile just appends another [`OverlayLayer`] with its own animator
//! and dismiss controller.
//!
//! Closing an overlay that has children is a cascade: the deepest overlay
//! closes first, and each shallower one only starts closing once the one above
//! it has finished its transition and left the stack.

use std::time::Instant;

use crate::error::OverlayError;
use crate::gesture::{
    DismissController, DismissDecision, GestureConfig, GesturePhase, GestureSample,
};
use crate::kind::OverlayKind;
use crate::stack::{ModalStack, OverlayKey, OverlayState};
use crate::transition::{TransitionAnimator, TransitionConfig, TransitionDirection};

/// One open overlay: what it shows plus its own animator and controller.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    key: OverlayKey,
    kind: OverlayKind,
    animator: TransitionAnimator,
    controller: DismissController,
}

impl OverlayLayer {
    pub fn key(&self) -> &OverlayKey {
        &self.key
    }

    pub fn kind(&self) -> &OverlayKind {
        &self.kind
    }

    /// Presentation progress (1.0 = fully open).
    pub fn progress(&self) -> f32 {
        self.animator.value()
    }

    pub fn phase(&self) -> GesturePhase {
        self.controller.phase()
    }

    pub fn animator(&self) -> &TransitionAnimator {
        &self.animator
    }

    pub fn controller(&self) -> &DismissController {
        &self.controller
    }
}

/// Stack changes reported by [`OverlayComposer::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    /// The overlay finished opening and is now interactive.
    Opened(OverlayKey),
    /// The overlay finished closing and left the stack.
    Popped(OverlayKey),
}

/// Owns the open overlays and enforces the nesting and close rules.
#[derive(Debug)]
pub struct OverlayComposer {
    stack: ModalStack,
    gesture: GestureConfig,
    transition: TransitionConfig,
    layers: Vec<OverlayLayer>,
    cascade_target: Option<OverlayKey>,
}

impl OverlayComposer {
    /// Creates a composer registering its overlays in `stack`.
    pub fn new(stack: ModalStack, gesture: GestureConfig, transition: TransitionConfig) -> Self {
        Self {
            stack,
            gesture,
            transition,
            layers: Vec::new(),
            cascade_target: None,
        }
    }

    /// The registry shared with every controller.
    pub fn stack(&self) -> &ModalStack {
        &self.stack
    }

    /// Open overlays, shallowest first.
    pub fn layers(&self) -> &[OverlayLayer] {
        &self.layers
    }

    pub fn layer(&self, key: &OverlayKey) -> Option<&OverlayLayer> {
        self.layers.iter().find(|layer| &layer.key == key)
    }

    pub fn top_layer(&self) -> Option<&OverlayLayer> {
        self.layers.last()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns `true` while a cascade close is running.
    pub fn is_cascading(&self) -> bool {
        self.cascade_target.is_some()
    }

    fn depth_of(&self, key: &OverlayKey) -> Result<usize, OverlayError> {
        self.layers
            .iter()
            .position(|layer| &layer.key == key)
            .ok_or_else(|| OverlayError::UnknownOverlay(key.clone()))
    }

    fn layer_mut(&mut self, key: &OverlayKey) -> Option<&mut OverlayLayer> {
        self.layers.iter_mut().find(|layer| &layer.key == key)
    }

    /// Opens an overlay from the base screen. Only possible while no overlay
    /// covers the screen.
    pub fn open_root(
        &mut self,
        kind: OverlayKind,
        now: Instant,
    ) -> Result<OverlayKey, OverlayError> {
        if self.cascade_target.is_some() {
            return Err(OverlayError::CascadeInProgress);
        }
        if let Some(top) = self.layers.last() {
            return Err(OverlayError::ParentNotActive(top.key.clone()));
        }
        let key = OverlayKey::root(kind.segment());
        self.mount(key, kind, now)
    }

    /// Opens `kind` on top of `parent`, which must be the top overlay.
    pub fn open_child(
        &mut self,
        parent: &OverlayKey,
        kind: OverlayKind,
        now: Instant,
    ) -> Result<OverlayKey, OverlayError> {
        if self.cascade_target.is_some() {
            return Err(OverlayError::CascadeInProgress);
        }
        let depth = self.depth_of(parent)?;
        let host = &self.layers[depth];

        if !self.stack.is_top(parent) || self.stack.state(parent) == OverlayState::Closing {
            return Err(OverlayError::ParentNotActive(parent.clone()));
        }
        if !host.kind.can_host(&kind) {
            return Err(OverlayError::UnsupportedNesting {
                parent: host.kind.segment(),
                child: kind.segment(),
            });
        }

        let key = parent.child(kind.segment());
        self.mount(key, kind, now)
    }

    /// Opens `kind` from whatever is on top: the top overlay, or the base
    /// screen when nothing is open.
    pub fn open(&mut self, kind: OverlayKind, now: Instant) -> Result<OverlayKey, OverlayError> {
        match self.layers.last().map(|layer| layer.key.clone()) {
            Some(parent) => self.open_child(&parent, kind, now),
            None => self.open_root(kind, now),
        }
    }

    fn mount(
        &mut self,
        key: OverlayKey,
        kind: OverlayKind,
        now: Instant,
    ) -> Result<OverlayKey, OverlayError> {
        let handle = self.stack.push(key.clone())?;
        log::debug!("open {} as {} (depth {})", kind, key, handle.depth);

        let mut animator = TransitionAnimator::new(self.transition);
        animator.open(now);
        let controller = DismissController::new(key.clone(), self.stack.clone(), self.gesture);
        self.layers.push(OverlayLayer {
            key: key.clone(),
            kind,
            animator,
            controller,
        });
        Ok(key)
    }

    /// Closes `key` and everything opened on top of it, deepest first.
    ///
    /// Returns immediately; the cascade advances from [`tick`](Self::tick).
    pub fn close(&mut self, key: &OverlayKey, now: Instant) -> Result<(), OverlayError> {
        let depth = self.depth_of(key)?;
        if let Some(target) = &self.cascade_target {
            let current = self.depth_of(target)?;
            if current <= depth {
                return Ok(());
            }
        }
        log::debug!(
            "close {} with {} descendants",
            key,
            self.layers.len() - depth - 1
        );
        self.cascade_target = Some(key.clone());
        self.advance_cascade(now)
    }

    /// Closes every open overlay.
    pub fn close_all(&mut self, now: Instant) -> Result<(), OverlayError> {
        match self.layers.first().map(|layer| layer.key.clone()) {
            Some(root) => self.close(&root, now),
            None => Ok(()),
        }
    }

    fn advance_cascade(&mut self, now: Instant) -> Result<(), OverlayError> {
        if self.cascade_target.is_none() {
            return Ok(());
        }
        let Some(top) = self.layers.last_mut() else {
            self.cascade_target = None;
            return Ok(());
        };
        if top.controller.phase() == GesturePhase::Committing {
            return Ok(());
        }
        log::debug!("cascade closing {}", top.key);
        top.controller.request_close(&mut top.animator, now)?;
        Ok(())
    }

    /// Advances every overlay's transition to `now` and applies completions.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<OverlayEvent>, OverlayError> {
        let mut events = Vec::new();
        let mut popped = false;

        for index in (0..self.layers.len()).rev() {
            let layer = &mut self.layers[index];
            let Some(completion) = layer.animator.tick(now) else {
                continue;
            };
            let was_opening = self.stack.state(&layer.key) == OverlayState::Opening;

            match layer.controller.on_transition_complete(completion)? {
                Some(handle) => {
                    self.layers.remove(index);
                    if self.cascade_target.as_ref() == Some(&handle.key) {
                        self.cascade_target = None;
                    }
                    popped = true;
                    events.push(OverlayEvent::Popped(handle.key));
                }
                None if was_opening && completion.direction == TransitionDirection::Open => {
                    events.push(OverlayEvent::Opened(layer.key.clone()));
                }
                None => {}
            }
        }

        if popped {
            self.advance_cascade(now)?;
        }
        Ok(events)
    }

    /// Tears down `key` and its descendants immediately, without transitions.
    ///
    /// Pending completions are cancelled so none fires after teardown.
    /// Returns the removed keys, deepest first.
    pub fn destroy(
        &mut self,
        key: &OverlayKey,
        now: Instant,
    ) -> Result<Vec<OverlayKey>, OverlayError> {
        let depth = self.depth_of(key)?;
        let mut removed = Vec::with_capacity(self.layers.len() - depth);

        while self.layers.len() > depth {
            let Some(mut layer) = self.layers.pop() else {
                break;
            };
            layer.animator.cancel();
            layer.controller.reset();
            self.stack.pop(&layer.key)?;
            removed.push(layer.key);
        }
        log::debug!("destroyed {:?}", removed);

        if let Some(target) = &self.cascade_target {
            if removed.contains(target) {
                self.cascade_target = None;
            } else {
                self.advance_cascade(now)?;
            }
        }
        Ok(removed)
    }

    /// Routes a drag start to `key`. Returns `false` if the overlay ignores it.
    pub fn drag_start(&mut self, key: &OverlayKey, now: Instant) -> bool {
        match self.layer_mut(key) {
            Some(layer) => layer.controller.on_drag_start(&mut layer.animator, now),
            None => false,
        }
    }

    /// Routes a drag frame to `key`.
    pub fn gesture_sample(&mut self, key: &OverlayKey, sample: GestureSample) -> DismissDecision {
        match self.layer_mut(key) {
            Some(layer) => layer.controller.on_gesture_sample(sample, &mut layer.animator),
            None => DismissDecision::Continue,
        }
    }

    /// Routes a drag release to `key`.
    pub fn gesture_release(
        &mut self,
        key: &OverlayKey,
        now: Instant,
    ) -> Result<DismissDecision, OverlayError> {
        let layer = self
            .layer_mut(key)
            .ok_or_else(|| OverlayError::UnknownOverlay(key.clone()))?;
        Ok(layer.controller.on_gesture_release(&mut layer.animator, now)?)
    }
}
