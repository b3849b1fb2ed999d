//! Open/close transitions for a single overlay.
//!
//! Each overlay owns one [`TransitionAnimator`]. The animator is the only
//! writer of the overlay's presentation progress; everything else reads it
//! through [`TransitionAnimator::value`].
//!
//! Progress runs from `0.0` (dismissed, off screen) to `1.0` (fully open).
//! Time is passed in explicitly, so the event loop decides when frames happen.

use std::time::{Duration, Instant};

/// Progress curve of a transition.
///
/// Overlays slide in on [`Decelerate`](Self::Decelerate) and out on
/// [`Accelerate`](Self::Accelerate), so a close that reverses an open mirrors it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    Linear,
    /// Quick start, settles into place. Used for opening.
    Decelerate,
    /// Slow start, leaves quickly. Used for closing.
    Accelerate,
}

impl Easing {
    /// Maps linear progress `t` in `0.0..=1.0` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Decelerate => 1.0 - (1.0 - t).powi(2),
            Self::Accelerate => t.powi(2),
        }
    }
}

/// Timing configuration for an overlay's open and close transitions.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use animora_overlay::{Easing, TransitionConfig};
///
/// let config = TransitionConfig::default()
///     .with_open(Duration::from_millis(250), Easing::Decelerate)
///     .with_reduced_motion(true);
/// assert!(config.reduced_motion);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionConfig {
    /// Duration of `open()`.
    ///
    /// Default: 300ms
    pub open_duration: Duration,
    /// Easing of `open()`.
    ///
    /// Default: decelerate
    pub open_easing: Easing,
    /// Duration of `close()`.
    ///
    /// Default: 200ms
    pub close_duration: Duration,
    /// Easing of `close()`.
    ///
    /// Default: accelerate
    pub close_easing: Easing,
    /// When set, transitions complete on the next tick.
    pub reduced_motion: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            open_duration: Duration::from_millis(300),
            open_easing: Easing::Decelerate,
            close_duration: Duration::from_millis(200),
            close_easing: Easing::Accelerate,
            reduced_motion: false,
        }
    }
}

impl TransitionConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the open duration and easing.
    pub fn with_open(mut self, duration: Duration, easing: Easing) -> Self {
        self.open_duration = duration;
        self.open_easing = easing;
        self
    }

    /// Sets the close duration and easing.
    pub fn with_close(mut self, duration: Duration, easing: Easing) -> Self {
        self.close_duration = duration;
        self.close_easing = easing;
        self
    }

    /// Enables or disables reduced motion.
    pub fn with_reduced_motion(mut self, enabled: bool) -> Self {
        self.reduced_motion = enabled;
        self
    }
}

/// Which way a transition moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDirection {
    /// Towards fully open (`1.0`).
    Open,
    /// Towards dismissed (`0.0`).
    Close,
}

impl TransitionDirection {
    fn target(self) -> f32 {
        match self {
            Self::Open => 1.0,
            Self::Close => 0.0,
        }
    }
}

/// Identifies one `open()`/`close()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionTicket(u64);

/// Reported exactly once when an `open()`/`close()` call runs to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionCompletion {
    /// The call that completed.
    pub ticket: TransitionTicket,
    /// Direction of the completed transition.
    pub direction: TransitionDirection,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTransition {
    ticket: TransitionTicket,
    direction: TransitionDirection,
    from: f32,
    start: Instant,
    duration: Duration,
    easing: Easing,
}

impl ActiveTransition {
    fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn value_at(&self, now: Instant) -> f32 {
        let eased = self.easing.apply(self.progress(now));
        lerp(self.from, self.direction.target(), eased)
    }

    fn is_complete(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

/// Drives one overlay's presentation progress.
#[derive(Debug, Clone)]
pub struct TransitionAnimator {
    config: TransitionConfig,
    value: f32,
    active: Option<ActiveTransition>,
    next_ticket: u64,
}

impl TransitionAnimator {
    /// Creates an animator at the dismissed position.
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            value: 0.0,
            active: None,
            next_ticket: 0,
        }
    }

    /// The animator's configuration.
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Starts animating towards fully open.
    ///
    /// Any in-flight transition is dropped without completing, and the new one
    /// starts from the value it had reached at `now`.
    pub fn open(&mut self, now: Instant) -> TransitionTicket {
        self.start(TransitionDirection::Open, now)
    }

    /// Starts animating towards dismissed. Same re-entrancy rules as [`open`](Self::open).
    pub fn close(&mut self, now: Instant) -> TransitionTicket {
        self.start(TransitionDirection::Close, now)
    }

    fn start(&mut self, direction: TransitionDirection, now: Instant) -> TransitionTicket {
        let from = self.value_at(now);
        if let Some(previous) = self.active.take() {
            log::debug!(
                "transition {:?} superseded by {:?} at {:.3}",
                previous.direction,
                direction,
                from
            );
        }

        let (duration, easing) = match direction {
            TransitionDirection::Open => (self.config.open_duration, self.config.open_easing),
            TransitionDirection::Close => (self.config.close_duration, self.config.close_easing),
        };
        let duration = if self.config.reduced_motion {
            Duration::ZERO
        } else {
            duration
        };

        let ticket = TransitionTicket(self.next_ticket);
        self.next_ticket += 1;
        self.value = from;
        self.active = Some(ActiveTransition {
            ticket,
            direction,
            from,
            start: now,
            duration,
            easing,
        });
        ticket
    }

    /// Advances to `now`, returning the completion of the in-flight transition
    /// if it has just finished.
    pub fn tick(&mut self, now: Instant) -> Option<TransitionCompletion> {
        let active = self.active?;
        self.value = active.value_at(now);
        if !active.is_complete(now) {
            return None;
        }
        self.value = active.direction.target();
        self.active = None;
        Some(TransitionCompletion {
            ticket: active.ticket,
            direction: active.direction,
        })
    }

    /// Sets the progress directly while a finger drags the overlay.
    ///
    /// Drops any in-flight transition without completing it.
    pub fn follow(&mut self, progress: f32) {
        self.active = None;
        self.value = progress.clamp(0.0, 1.0);
    }

    /// Drops the in-flight transition without completing it.
    ///
    /// Used when the overlay is torn down before its transition ends.
    pub fn cancel(&mut self) -> Option<TransitionTicket> {
        self.active.take().map(|active| active.ticket)
    }

    /// Progress as of the last `tick`/`follow`.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Progress interpolated at `now` without advancing the animator.
    pub fn value_at(&self, now: Instant) -> f32 {
        self.active
            .as_ref()
            .map_or(self.value, |active| active.value_at(now))
    }

    /// Direction of the in-flight transition, if any.
    pub fn direction(&self) -> Option<TransitionDirection> {
        self.active.map(|active| active.direction)
    }

    /// Returns `true` while a transition is in flight.
    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// When the in-flight transition will finish.
    pub fn completion_time(&self) -> Option<Instant> {
        self.active.map(|active| active.start + active.duration)
    }
}

impl Default for TransitionAnimator {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_endpoints() {
        assert_eq!(lerp(0.2, 1.0, 0.0), 0.2);
        assert_eq!(lerp(0.2, 1.0, 1.0), 1.0);
        assert!((lerp(0.0, 1.0, 0.5) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_duration_is_complete_immediately() {
        let now = Instant::now();
        let active = ActiveTransition {
            ticket: TransitionTicket(0),
            direction: TransitionDirection::Close,
            from: 1.0,
            start: now,
            duration: Duration::ZERO,
            easing: Easing::Linear,
        };
        assert!(active.is_complete(now));
        assert_eq!(active.value_at(now), 0.0);
    }
}
