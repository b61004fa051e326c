//! Monotonic game clock.
//!
//! The clock is the single source of truth for "now" inside a session. It
//! counts elapsed game time in milliseconds from session start and is only
//! ever moved forward by the controller. Nothing in the core reads the wall
//! clock for scheduling, so every deadline is reproducible in tests.
//!
//! # Design Principles
//!
//! - All arithmetic is checked (no silent overflow).
//! - The clock never moves backwards; attempting to do so is an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Advancing would overflow the millisecond counter.
    #[error("game clock overflow: cannot advance beyond u64::MAX milliseconds")]
    Overflow,

    /// A caller tried to move the clock to an earlier instant.
    #[error("game clock cannot move backwards (now {now}, target {target})")]
    Backwards {
        /// The current instant.
        now: GameInstant,
        /// The requested, earlier instant.
        target: GameInstant,
    },
}

/// A point in game time, measured in milliseconds since session start.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameInstant(u64);

impl GameInstant {
    /// Session start.
    pub const ZERO: Self = Self(0);

    /// Build an instant from a millisecond offset.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since session start.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// The instant `delay` after this one, or `None` on overflow.
    pub fn checked_add(self, delay: Duration) -> Option<Self> {
        let millis = u64::try_from(delay.as_millis()).ok()?;
        self.0.checked_add(millis).map(Self)
    }

    /// Time elapsed from `earlier` to this instant, zero if `earlier` is later.
    pub const fn saturating_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl core::fmt::Display for GameInstant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Game clock tracking elapsed session time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameClock {
    now: GameInstant,
}

impl GameClock {
    /// Create a clock at session start.
    pub const fn new() -> Self {
        Self {
            now: GameInstant::ZERO,
        }
    }

    /// The current instant.
    pub const fn now(&self) -> GameInstant {
        self.now
    }

    /// Move the clock forward by `elapsed`. Returns the new instant.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the counter would overflow.
    pub fn advance(&mut self, elapsed: Duration) -> Result<GameInstant, ClockError> {
        self.now = self.now.checked_add(elapsed).ok_or(ClockError::Overflow)?;
        Ok(self.now)
    }

    /// Move the clock forward to exactly `target`.
    ///
    /// Moving to the current instant is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Backwards`] if `target` is earlier than now.
    pub fn advance_to(&mut self, target: GameInstant) -> Result<GameInstant, ClockError> {
        if target < self.now {
            return Err(ClockError::Backwards {
                now: self.now,
                target,
            });
        }
        self.now = target;
        Ok(self.now)
    }

    /// Rewind to session start. Only used when a new session begins.
    pub const fn reset(&mut self) {
        self.now = GameInstant::ZERO;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let clock = GameClock::new();
        assert_eq!(clock.now(), GameInstant::ZERO);
    }

    #[test]
    fn clock_advances_by_duration() {
        let mut clock = GameClock::new();
        clock.advance(Duration::from_millis(250)).unwrap();
        clock.advance(Duration::from_secs(2)).unwrap();
        assert_eq!(clock.now().as_millis(), 2250);
    }

    #[test]
    fn advance_to_rejects_earlier_instant() {
        let mut clock = GameClock::new();
        clock.advance(Duration::from_secs(5)).unwrap();
        let result = clock.advance_to(GameInstant::from_millis(1000));
        assert!(matches!(result, Err(ClockError::Backwards { .. })));
        assert_eq!(clock.now().as_millis(), 5000);
    }

    #[test]
    fn advance_to_same_instant_is_noop() {
        let mut clock = GameClock::new();
        clock.advance(Duration::from_secs(1)).unwrap();
        clock.advance_to(GameInstant::from_millis(1000)).unwrap();
        assert_eq!(clock.now().as_millis(), 1000);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut clock = GameClock::new();
        clock.advance_to(GameInstant::from_millis(u64::MAX)).unwrap();
        assert!(matches!(
            clock.advance(Duration::from_millis(1)),
            Err(ClockError::Overflow)
        ));
    }

    #[test]
    fn saturating_since() {
        let later = GameInstant::from_millis(3000);
        let earlier = GameInstant::from_millis(1000);
        assert_eq!(later.saturating_since(earlier), Duration::from_secs(2));
        assert_eq!(earlier.saturating_since(later), Duration::ZERO);
    }

    #[test]
    fn reset_rewinds() {
        let mut clock = GameClock::new();
        clock.advance(Duration::from_secs(9)).unwrap();
        clock.reset();
        assert_eq!(clock.now(), GameInstant::ZERO);
    }
}
