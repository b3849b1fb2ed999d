//! Swipe-to-dismiss gesture handling.
//!
//! A [`DismissController`] turns raw drag samples into a commit/cancel
//! decision for one overlay. The controller only accepts a drag while its
//! overlay is the open top of the [`ModalStack`]; covered overlays never see
//! input.
//!
//! ```text
//! Idle ──drag start (top & open)──▶ Tracking ──release──▶ Committing ──close done──▶ Idle (popped)
//!                                       │
//!                                       └──────release──▶ Cancelling ──spring back done──▶ Idle
//! ```

use std::time::Instant;

use crate::error::StackError;
use crate::stack::{ModalStack, OverlayHandle, OverlayKey, OverlayState};
use crate::transition::{
    TransitionAnimator, TransitionCompletion, TransitionDirection, TransitionTicket,
};

/// Gesture thresholds.
///
/// Distances are in logical points, velocities in points per millisecond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// A sample is a horizontal swipe when `|dx| > dominance_ratio * |dy|`.
    ///
    /// Default: 1.5
    pub dominance_ratio: f32,
    /// Cumulative `dx` beyond which a release commits.
    ///
    /// Default: 100.0
    pub commit_distance: f32,
    /// Release `velocity_x` beyond which a release commits.
    ///
    /// Default: 0.5
    pub commit_velocity: f32,
    /// Width of the overlay; maps `dx` onto transition progress.
    ///
    /// Default: 390.0
    pub overlay_width: f32,
    /// Forward motion below this is not followed visually.
    ///
    /// Default: 1.0
    pub min_follow_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            dominance_ratio: 1.5,
            commit_distance: 100.0,
            commit_velocity: 0.5,
            overlay_width: 390.0,
            min_follow_distance: 1.0,
        }
    }
}

impl GestureConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the direction dominance ratio.
    pub fn with_dominance_ratio(mut self, ratio: f32) -> Self {
        self.dominance_ratio = ratio;
        self
    }

    /// Sets the commit distance.
    pub fn with_commit_distance(mut self, distance: f32) -> Self {
        self.commit_distance = distance;
        self
    }

    /// Sets the commit velocity.
    pub fn with_commit_velocity(mut self, velocity: f32) -> Self {
        self.commit_velocity = velocity;
        self
    }

    /// Sets the overlay width.
    pub fn with_overlay_width(mut self, width: f32) -> Self {
        self.overlay_width = width;
        self
    }

    /// Sets the horizontal distance a drag must cover before the overlay follows it.
    pub fn with_min_follow_distance(mut self, distance: f32) -> Self {
        self.min_follow_distance = distance;
        self
    }

    /// Returns `true` if the sample reads as a horizontal swipe rather than a
    /// vertical scroll of nested content.
    pub fn is_horizontal(&self, sample: &GestureSample) -> bool {
        sample.dx.abs() > self.dominance_ratio * sample.dy.abs()
    }

    /// Transition progress for a drag of `dx` points.
    pub fn progress_for(&self, dx: f32) -> f32 {
        if self.overlay_width <= 0.0 {
            return 1.0;
        }
        1.0 - dx / self.overlay_width
    }
}

/// One frame of a drag, measured from where the gesture started.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureSample {
    pub dx: f32,
    pub dy: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
}

impl GestureSample {
    /// A sample with the given displacement and no velocity.
    pub fn at(dx: f32, dy: f32) -> Self {
        Self {
            dx,
            dy,
            ..Self::default()
        }
    }

    /// Sets the velocity.
    pub fn with_velocity(mut self, velocity_x: f32, velocity_y: f32) -> Self {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
        self
    }
}

/// Outcome of feeding the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissDecision {
    /// Keep tracking (or nothing to decide).
    Continue,
    /// Dismiss the overlay.
    Commit,
    /// Spring back to fully open.
    Cancel,
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Tracking,
    Committing,
    Cancelling,
}

/// Classifies a finished gesture.
///
/// A gesture that never read as a horizontal swipe was a scroll of the
/// overlay's content and always cancels.
pub fn decide(samples: &[GestureSample], config: &GestureConfig) -> DismissDecision {
    let Some(last) = samples.last() else {
        return DismissDecision::Cancel;
    };
    if !samples.iter().any(|sample| config.is_horizontal(sample)) {
        return DismissDecision::Cancel;
    }
    if last.dx > config.commit_distance || last.velocity_x > config.commit_velocity {
        DismissDecision::Commit
    } else {
        DismissDecision::Cancel
    }
}

/// Per-overlay swipe-to-dismiss state machine.
#[derive(Debug, Clone)]
pub struct DismissController {
    key: OverlayKey,
    stack: ModalStack,
    config: GestureConfig,
    phase: GesturePhase,
    samples: Vec<GestureSample>,
    following: bool,
    awaiting: Option<TransitionTicket>,
}

impl DismissController {
    /// Creates a controller for the overlay registered under `key`.
    pub fn new(key: OverlayKey, stack: ModalStack, config: GestureConfig) -> Self {
        Self {
            key,
            stack,
            config,
            phase: GesturePhase::Idle,
            samples: Vec::new(),
            following: false,
            awaiting: None,
        }
    }

    pub fn key(&self) -> &OverlayKey {
        &self.key
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Samples collected during the current gesture.
    pub fn samples(&self) -> &[GestureSample] {
        &self.samples
    }

    /// Returns `true` while the overlay visually tracks the finger.
    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Returns `true` if this overlay may take input right now.
    pub fn owns_input(&self) -> bool {
        self.stack.is_top(&self.key) && self.stack.state(&self.key) == OverlayState::Open
    }

    /// Starts a drag at `now`. Returns `false` when the gesture is ignored.
    pub fn on_drag_start(&mut self, animator: &mut TransitionAnimator, now: Instant) -> bool {
        match self.phase {
            GesturePhase::Tracking => return true,
            GesturePhase::Committing => return false,
            GesturePhase::Idle | GesturePhase::Cancelling => {}
        }
        if !self.owns_input() {
            log::debug!("gesture on covered overlay {} ignored", self.key);
            return false;
        }

        if self.phase == GesturePhase::Cancelling {
            // Grab the overlay mid spring-back.
            animator.follow(animator.value_at(now));
        }
        self.awaiting = None;
        self.samples.clear();
        self.following = false;
        self.phase = GesturePhase::Tracking;
        true
    }

    /// Feeds one drag frame.
    pub fn on_gesture_sample(
        &mut self,
        sample: GestureSample,
        animator: &mut TransitionAnimator,
    ) -> DismissDecision {
        if self.phase != GesturePhase::Tracking {
            return DismissDecision::Continue;
        }

        self.samples.push(sample);
        self.following =
            self.config.is_horizontal(&sample) && sample.dx > self.config.min_follow_distance;
        if self.following {
            animator.follow(self.config.progress_for(sample.dx));
        }
        DismissDecision::Continue
    }

    /// Ends the drag and acts on the decision.
    pub fn on_gesture_release(
        &mut self,
        animator: &mut TransitionAnimator,
        now: Instant,
    ) -> Result<DismissDecision, StackError> {
        if self.phase != GesturePhase::Tracking {
            return Ok(DismissDecision::Continue);
        }

        let decision = if self.stack.is_top(&self.key) {
            decide(&self.samples, &self.config)
        } else {
            DismissDecision::Cancel
        };
        log::debug!(
            "gesture on {} released after {} samples: {:?}",
            self.key,
            self.samples.len(),
            decision
        );

        match decision {
            DismissDecision::Commit => self.commit(animator, now)?,
            _ => {
                self.samples.clear();
                self.following = false;
                self.awaiting = Some(animator.open(now));
                self.phase = GesturePhase::Cancelling;
            }
        }
        Ok(decision)
    }

    /// Explicit close action (back button, cascade step).
    ///
    /// Follows the same path as a committed swipe. Calling it while already
    /// committing does nothing.
    pub fn request_close(
        &mut self,
        animator: &mut TransitionAnimator,
        now: Instant,
    ) -> Result<(), StackError> {
        if self.phase == GesturePhase::Committing {
            return Ok(());
        }
        self.commit(animator, now)
    }

    fn commit(
        &mut self,
        animator: &mut TransitionAnimator,
        now: Instant,
    ) -> Result<(), StackError> {
        self.stack.begin_closing(&self.key)?;
        self.samples.clear();
        self.following = false;
        self.awaiting = Some(animator.close(now));
        self.phase = GesturePhase::Committing;
        Ok(())
    }

    /// Handles a completion reported by this overlay's animator.
    ///
    /// A finished close pops the overlay and returns its handle. A finished
    /// open marks the overlay open in the stack.
    pub fn on_transition_complete(
        &mut self,
        completion: TransitionCompletion,
    ) -> Result<Option<OverlayHandle>, StackError> {
        match completion.direction {
            TransitionDirection::Close => {
                if self.phase != GesturePhase::Committing
                    || self.awaiting != Some(completion.ticket)
                {
                    return Ok(None);
                }
                let handle = self.stack.pop(&self.key)?;
                self.awaiting = None;
                self.phase = GesturePhase::Idle;
                Ok(Some(handle))
            }
            TransitionDirection::Open => {
                if self.stack.state(&self.key) == OverlayState::Opening {
                    self.stack.mark_open(&self.key)?;
                }
                if self.phase == GesturePhase::Cancelling
                    && self.awaiting == Some(completion.ticket)
                {
                    self.awaiting = None;
                    self.phase = GesturePhase::Idle;
                }
                Ok(None)
            }
        }
    }

    /// Forgets any gesture in progress. Used when the overlay is torn down.
    pub fn reset(&mut self) {
        self.phase = GesturePhase::Idle;
        self.samples.clear();
        self.following = false;
        self.awaiting = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_without_samples_cancels() {
        assert_eq!(decide(&[], &GestureConfig::default()), DismissDecision::Cancel);
    }

    #[test]
    fn decide_vertical_scroll_cancels_even_when_far() {
        let samples = [GestureSample::at(120.0, 400.0)];
        assert_eq!(decide(&samples, &GestureConfig::default()), DismissDecision::Cancel);
    }

    #[test]
    fn progress_maps_width() {
        let config = GestureConfig::default().with_overlay_width(200.0);
        assert_eq!(config.progress_for(0.0), 1.0);
        assert_eq!(config.progress_for(100.0), 0.5);
    }
}
