//! Rotor position tracking.
//!
//! Open-loop: the position is the count of pulses issued since start-up,
//! wrapped into one revolution.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default microsteps per revolution (200-step motor at 1/8 microstepping).
pub const DEFAULT_STEPS_PER_REVOLUTION: u32 = 200 * 8;

/// Largest step target an angle may resolve to.
pub const MAX_TARGET_STEPS: i64 = 1 << 53;

/// Modular rotor position.
///
/// Written only by the pulse primitive; readable from any thread.
#[derive(Debug)]
pub struct Position {
    /// Current position in `[0, steps_per_revolution)`.
    steps: AtomicU32,
    /// Size of the modular position space.
    steps_per_revolution: u32,
}

impl Position {
    /// Create a position tracker at 0.
    pub fn new(steps_per_revolution: u32) -> Self {
        Self {
            steps: AtomicU32::new(0),
            steps_per_revolution,
        }
    }

    /// Get current position in steps.
    #[inline]
    pub fn steps(&self) -> u32 {
        self.steps.load(Ordering::SeqCst)
    }

    /// Get the size of one revolution in steps.
    #[inline]
    pub fn steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution
    }

    /// Move by a signed number of steps, wrapping around one revolution.
    ///
    /// Returns the new position.
    pub fn advance(&self, delta: i64) -> u32 {
        let next = self.wrap(i64::from(self.steps()) + delta);
        self.steps.store(next, Ordering::SeqCst);
        next
    }

    /// Wrap an unbounded step count into `[0, steps_per_revolution)`.
    #[inline]
    pub fn wrap(&self, steps: i64) -> u32 {
        // rem_euclid result is below steps_per_revolution, so it fits.
        steps.rem_euclid(i64::from(self.steps_per_revolution)) as u32
    }

    /// Absolute step target for an angle given in half-turns.
    ///
    /// `1.0` is half a revolution; the result is not wrapped. Returns `None`
    /// for a non-finite angle or a target beyond [`MAX_TARGET_STEPS`].
    pub fn half_turns_to_steps(&self, fraction: f64) -> Option<i64> {
        let steps = libm::round(f64::from(self.steps_per_revolution) * fraction / 2.0);
        if steps.is_finite() && steps.abs() <= MAX_TARGET_STEPS as f64 {
            Some(steps as i64)
        } else {
            None
        }
    }

    /// Signed steps from the current position to an unwrapped target.
    #[inline]
    pub fn steps_to(&self, target: i64) -> i64 {
        target.saturating_sub(i64::from(self.steps()))
    }

    /// Shortest signed step count back to position 0.
    ///
    /// Positions in the first half turn go back; the rest go forward.
    pub fn steps_to_origin(&self) -> i64 {
        let current = i64::from(self.steps());
        let revolution = i64::from(self.steps_per_revolution);
        if current < revolution / 2 {
            -current
        } else {
            revolution - current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_wraps() {
        let pos = Position::new(1600);

        assert_eq!(pos.advance(100), 100);
        assert_eq!(pos.advance(-150), 1550);
        assert_eq!(pos.advance(1650), 0);
        assert_eq!(pos.advance(-3200), 0);
    }

    #[test]
    fn test_half_turn_targets() {
        let pos = Position::new(1600);

        assert_eq!(pos.half_turns_to_steps(1.0), Some(800));
        assert_eq!(pos.half_turns_to_steps(0.25), Some(200));
        assert_eq!(pos.half_turns_to_steps(-0.5), Some(-400));
    }

    #[test]
    fn test_unusable_half_turn_targets() {
        let pos = Position::new(1600);

        for fraction in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300, -1e300] {
            assert_eq!(pos.half_turns_to_steps(fraction), None, "fraction {}", fraction);
        }
    }

    #[test]
    fn test_steps_to_saturates() {
        let pos = Position::new(1600);
        pos.advance(5);

        assert_eq!(pos.steps_to(i64::MIN), i64::MIN);
        assert_eq!(pos.steps_to(805), 800);
    }

    #[test]
    fn test_steps_to_origin() {
        let pos = Position::new(1600);
        assert_eq!(pos.steps_to_origin(), 0);

        pos.advance(10);
        assert_eq!(pos.steps_to_origin(), -10);

        pos.advance(790);
        assert_eq!(pos.steps_to_origin(), 800);

        pos.advance(400);
        assert_eq!(pos.steps_to_origin(), 400);
    }
}
