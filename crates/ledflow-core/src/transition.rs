//! Linear color cross-fades
//!
//! A [`ColorTransition`] is a single mutable color that fades from a start
//! color toward an optional target over a fixed duration. Reads settle the
//! transition lazily: the first read at or after the end of the fade collapses
//! it (`start := target`, no target), and every later read returns the same
//! value no matter how often it is sampled.

use crate::color::Rgb;

/// Time-bounded linear interpolation between two colors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorTransition {
    start: Rgb,
    target: Option<Rgb>,
    start_time: f64,
    duration: f64,
}

impl ColorTransition {
    /// A settled transition showing `color`
    pub fn new(color: Rgb) -> Self {
        Self {
            start: color,
            target: None,
            start_time: 0.0,
            duration: 0.0,
        }
    }

    /// Begin fading toward `color` over `duration` seconds.
    ///
    /// If a fade is in flight, the color interpolated at `now` becomes the new
    /// start so the output never jumps. A zero duration snaps on the next read.
    pub fn set_target(&mut self, color: Rgb, duration: f64, now: f64) {
        if self.target.is_some() {
            self.start = self.current_color(now);
        }
        self.target = Some(color);
        self.start_time = now;
        self.duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
    }

    /// Color at `now`, collapsing the fade once it has completed
    pub fn current_color(&mut self, now: f64) -> Rgb {
        match self.target {
            None => self.start,
            Some(target) if self.is_complete(now) => {
                self.start = target;
                self.target = None;
                target
            }
            Some(target) => self.start.lerp(target, self.fraction(now) as f32),
        }
    }

    /// Color at `now` without settling the transition
    pub fn peek(&self, now: f64) -> Rgb {
        match self.target {
            None => self.start,
            Some(target) if self.is_complete(now) => target,
            Some(target) => self.start.lerp(target, self.fraction(now) as f32),
        }
    }

    /// The color the fade started from
    pub fn start(&self) -> Rgb {
        self.start
    }

    /// Pending target, if a fade is in flight
    pub fn target(&self) -> Option<Rgb> {
        self.target
    }

    /// True once no fade is pending
    pub fn is_settled(&self) -> bool {
        self.target.is_none()
    }

    fn is_complete(&self, now: f64) -> bool {
        self.elapsed(now) >= self.duration
    }

    fn elapsed(&self, now: f64) -> f64 {
        (now - self.start_time).max(0.0)
    }

    // Only called while elapsed < duration, so duration > 0.
    fn fraction(&self, now: f64) -> f64 {
        self.elapsed(now) / self.duration
    }
}

impl Default for ColorTransition {
    fn default() -> Self {
        Self::new(Rgb::BLACK)
    }
}
