//! Meter economy: the four bounded meters, the day counter, and game over.
//!
//! Every mutation goes through [`Economy::apply_delta`]:
//!
//! 1. If the game is already over, nothing changes.
//! 2. Each delta is added with saturating arithmetic.
//! 3. Each meter is clamped to `METER_MIN..=METER_MAX`.
//! 4. The game-over predicate is evaluated in fixed priority order.
//!
//! The transition into game over is reported exactly once through
//! [`MeterUpdate::game_over`]; the controller turns that into the session
//! end.

use rand::Rng;
use supermart_types::{GameOverReason, METER_MAX, METER_MIN, MeterDelta, MeterState};

use crate::config::{ConfigError, EconomyConfig};

/// Half-open range `[min, max)` of daily stock depletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepletionRange {
    min: i32,
    max: i32,
}

impl DepletionRange {
    /// Build a range, rejecting empty or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] unless `min < max`.
    pub fn new(min: i32, max: i32) -> Result<Self, ConfigError> {
        if min >= max {
            return Err(ConfigError::Invalid {
                reason: format!("depletion range [{min}, {max}) is empty"),
            });
        }
        Ok(Self { min, max })
    }

    /// Build the range from the economy config.
    ///
    /// # Errors
    ///
    /// Same as [`DepletionRange::new`].
    pub fn from_config(config: &EconomyConfig) -> Result<Self, ConfigError> {
        Self::new(config.daily_depletion_min, config.daily_depletion_max)
    }

    /// Inclusive lower bound.
    pub const fn min(self) -> i32 {
        self.min
    }

    /// Exclusive upper bound.
    pub const fn max(self) -> i32 {
        self.max
    }

    fn sample<G: Rng + ?Sized>(self, rng: &mut G) -> i32 {
        rng.random_range(self.min..self.max)
    }
}

/// Outcome of one [`Economy::apply_delta`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterUpdate {
    /// The state after the call.
    pub state: MeterState,
    /// Set only on the call that ended the game.
    pub game_over: Option<GameOverReason>,
}

/// Outcome of one [`Economy::advance_day`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAdvance {
    /// The meter update caused by the depletion.
    pub update: MeterUpdate,
    /// Units of stock removed by the overnight depletion.
    pub depletion: i32,
}

/// Owner of the live [`MeterState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Economy {
    state: MeterState,
}

impl Economy {
    /// A fresh economy at the starting state.
    pub const fn new() -> Self {
        Self {
            state: MeterState::initial(),
        }
    }

    /// Resume from a previously captured state.
    pub const fn from_state(state: MeterState) -> Self {
        Self { state }
    }

    /// Current state.
    pub const fn state(&self) -> MeterState {
        self.state
    }

    /// Whether the game-over latch is set.
    pub const fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    /// Apply a delta to all four meters, clamp, and evaluate game over.
    ///
    /// A no-op once the game is over.
    pub fn apply_delta(&mut self, delta: MeterDelta) -> MeterUpdate {
        if self.state.game_over {
            return MeterUpdate {
                state: self.state,
                game_over: None,
            };
        }

        let s = &mut self.state;
        s.stock = clamp_meter(s.stock.saturating_add(delta.stock));
        s.satisfaction = clamp_meter(s.satisfaction.saturating_add(delta.satisfaction));
        s.profit = clamp_meter(s.profit.saturating_add(delta.profit));
        s.morale = clamp_meter(s.morale.saturating_add(delta.morale));

        let reason = game_over_reason(s);
        if let Some(reason) = reason {
            s.game_over = true;
            s.game_over_reason = Some(reason);
        }

        MeterUpdate {
            state: self.state,
            game_over: reason,
        }
    }

    /// Move to the next day and apply the overnight stock depletion.
    ///
    /// Returns `None` (and changes nothing) once the game is over.
    pub fn advance_day<G: Rng + ?Sized>(
        &mut self,
        rng: &mut G,
        range: DepletionRange,
    ) -> Option<DayAdvance> {
        if self.state.game_over {
            return None;
        }
        self.state.day = self.state.day.saturating_add(1);
        let depletion = range.sample(rng);
        let update = self.apply_delta(MeterDelta::stock_only(depletion.saturating_neg()));
        Some(DayAdvance { update, depletion })
    }
}

/// The game-over reason for a state, checked in priority order.
///
/// Stockout beats Boycott beats Bankruptcy beats Strike.
pub const fn game_over_reason(state: &MeterState) -> Option<GameOverReason> {
    if state.stock <= METER_MIN {
        Some(GameOverReason::Stockout)
    } else if state.satisfaction <= METER_MIN {
        Some(GameOverReason::Boycott)
    } else if state.profit <= METER_MIN {
        Some(GameOverReason::Bankruptcy)
    } else if state.morale <= METER_MIN {
        Some(GameOverReason::Strike)
    } else {
        None
    }
}

const fn clamp_meter(value: i32) -> i32 {
    if value < METER_MIN {
        METER_MIN
    } else if value > METER_MAX {
        METER_MAX
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn default_range() -> DepletionRange {
        DepletionRange::new(5, 15).unwrap()
    }

    #[test]
    fn delta_adds_and_clamps() {
        let mut economy = Economy::new();
        let update = economy.apply_delta(MeterDelta::new(80, -20, 3, 0));
        assert_eq!(update.state.stock, 100);
        assert_eq!(update.state.satisfaction, 30);
        assert_eq!(update.state.profit, 53);
        assert_eq!(update.state.morale, 50);
        assert!(update.game_over.is_none());
    }

    #[test]
    fn extreme_deltas_do_not_overflow() {
        let mut economy = Economy::new();
        let update = economy.apply_delta(MeterDelta::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX));
        assert_eq!(update.state.snapshot().stock, 100);
        assert_eq!(update.state.snapshot().morale, 100);
        let update = economy.apply_delta(MeterDelta::new(0, 0, 0, i32::MIN));
        assert_eq!(update.state.morale, 0);
        assert_eq!(update.game_over, Some(GameOverReason::Strike));
    }

    #[test]
    fn stockout_wins_simultaneous_zero() {
        let mut economy = Economy::new();
        let update = economy.apply_delta(MeterDelta::new(-50, -50, -50, -50));
        assert_eq!(update.game_over, Some(GameOverReason::Stockout));
        assert_eq!(economy.state().game_over_reason, Some(GameOverReason::Stockout));
    }

    #[test]
    fn priority_order_below_stock() {
        let cases = [
            (MeterDelta::new(0, -50, -50, -50), GameOverReason::Boycott),
            (MeterDelta::new(0, 0, -50, -50), GameOverReason::Bankruptcy),
            (MeterDelta::new(0, 0, 0, -50), GameOverReason::Strike),
        ];
        for (delta, expected) in cases {
            let mut economy = Economy::new();
            assert_eq!(economy.apply_delta(delta).game_over, Some(expected));
        }
    }

    #[test]
    fn game_over_reported_once_then_frozen() {
        let mut economy = Economy::new();
        let first = economy.apply_delta(MeterDelta::stock_only(-60));
        assert_eq!(first.game_over, Some(GameOverReason::Stockout));

        let second = economy.apply_delta(MeterDelta::new(30, 30, 30, 30));
        assert!(second.game_over.is_none());
        assert_eq!(second.state, first.state);

        let mut rng = StdRng::seed_from_u64(3);
        assert!(economy.advance_day(&mut rng, default_range()).is_none());
        assert_eq!(economy.state().day, 1);
    }

    #[test]
    fn day_advance_depletes_within_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let mut economy = Economy::new();
            let advance = economy.advance_day(&mut rng, default_range()).unwrap();
            assert!((5..15).contains(&advance.depletion));
            assert_eq!(advance.update.state.day, 2);
            assert_eq!(advance.update.state.stock, 50 - advance.depletion);
            assert_eq!(advance.update.state.satisfaction, 50);
        }
    }

    #[test]
    fn empty_depletion_range_rejected() {
        assert!(DepletionRange::new(5, 5).is_err());
        assert!(DepletionRange::new(9, 2).is_err());
    }

    #[test]
    fn resume_from_state() {
        let mut state = MeterState::initial();
        state.profit = 7;
        state.day = 4;
        let mut economy = Economy::from_state(state);
        let update = economy.apply_delta(MeterDelta::new(0, 0, -7, 0));
        assert_eq!(update.game_over, Some(GameOverReason::Bankruptcy));
        assert_eq!(update.state.day, 4);
    }
}
