//! Monotonic session clock
//!
//! All simulations take `now` as seconds since the session origin. This type is
//! the only place that touches `Instant`.

use std::time::Instant;

/// Maps wall-clock instants onto the session timeline (seconds as `f64`)
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    /// Start a new timeline at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the origin
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Convert an instant into session seconds (negative before the origin)
    pub fn seconds_at(&self, instant: Instant) -> f64 {
        match instant.checked_duration_since(self.origin) {
            Some(d) => d.as_secs_f64(),
            None => -(self.origin.duration_since(instant).as_secs_f64()),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_is_monotonic() {
        let clock = SessionClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a >= 0.0);
    }

    #[test]
    fn test_seconds_at_offsets() {
        let clock = SessionClock::new();
        let later = clock.origin + Duration::from_millis(1500);
        assert!((clock.seconds_at(later) - 1.5).abs() < 1e-6);
        if let Some(earlier) = clock.origin.checked_sub(Duration::from_secs(2)) {
            assert!((clock.seconds_at(earlier) + 2.0).abs() < 1e-6);
        }
    }
}
