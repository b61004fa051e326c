//! Scripted players for the headless engine.
//!
//! The engine has no screen, so a [`PlayerPolicy`] stands in for the
//! person tapping left or right. [`RandomPlayer`] answers every decision
//! with a random side after a reaction delay; [`IdlePlayer`] never answers
//! and lets every timeout fire.

use std::path::Path;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use supermart_core::clock::GameInstant;
use supermart_core::decision::Presentation;
use supermart_types::{ChoiceSide, PresentationId};

use crate::error::EngineError;

/// Default game time the random player waits before answering.
const DEFAULT_REACTION_MS: u64 = 3_000;

/// Which scripted player to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotMode {
    /// Answer with a random side.
    #[default]
    Random,
    /// Never answer.
    Idle,
}

/// The `autopilot` section of `supermart-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutopilotConfig {
    /// Which player to run.
    #[serde(default)]
    pub mode: AutopilotMode,
    /// Game time to wait before answering, in milliseconds.
    #[serde(default = "default_reaction_ms")]
    pub reaction_ms: u64,
}

const fn default_reaction_ms() -> u64 {
    DEFAULT_REACTION_MS
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            mode: AutopilotMode::default(),
            reaction_ms: DEFAULT_REACTION_MS,
        }
    }
}

impl AutopilotConfig {
    /// Read the `autopilot` section from the config file, if present.
    ///
    /// A missing file or section yields the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Autopilot {
            message: format!("failed to read config file: {e}"),
        })?;
        let raw: serde_yml::Value =
            serde_yml::from_str(&contents).map_err(|e| EngineError::Autopilot {
                message: format!("failed to parse config YAML: {e}"),
            })?;
        match raw.get("autopilot") {
            Some(section) => {
                serde_yml::from_value(section.clone()).map_err(|e| EngineError::Autopilot {
                    message: format!("failed to parse autopilot config: {e}"),
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Build the configured player.
    pub fn build(&self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self.mode {
            AutopilotMode::Random => Box::new(RandomPlayer::new(
                seed,
                Duration::from_millis(self.reaction_ms),
            )),
            AutopilotMode::Idle => Box::new(IdlePlayer),
        }
    }
}

/// A source of answers to presented decisions.
pub trait PlayerPolicy: Send {
    /// Pick answers for the decisions on screen at game time `now`.
    ///
    /// Decisions left out of the result stay on screen; the store applies
    /// their right branch when the timeout fires.
    fn answer(
        &mut self,
        pending: &[&Presentation],
        now: GameInstant,
    ) -> Vec<(PresentationId, ChoiceSide)>;
}

/// Answers each decision with a coin flip once it has been on screen for
/// the reaction delay.
#[derive(Debug)]
pub struct RandomPlayer {
    rng: StdRng,
    reaction: Duration,
}

impl RandomPlayer {
    /// Create a player with a seeded coin.
    pub fn new(seed: u64, reaction: Duration) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            reaction,
        }
    }
}

impl PlayerPolicy for RandomPlayer {
    fn answer(
        &mut self,
        pending: &[&Presentation],
        now: GameInstant,
    ) -> Vec<(PresentationId, ChoiceSide)> {
        pending
            .iter()
            .filter(|p| now.saturating_since(p.presented_at) >= self.reaction)
            .map(|p| {
                let side = if self.rng.random_bool(0.5) {
                    ChoiceSide::Left
                } else {
                    ChoiceSide::Right
                };
                (p.id, side)
            })
            .collect()
    }
}

/// Never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdlePlayer;

impl PlayerPolicy for IdlePlayer {
    fn answer(
        &mut self,
        _pending: &[&Presentation],
        _now: GameInstant,
    ) -> Vec<(PresentationId, ChoiceSide)> {
        Vec::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use supermart_core::config::StoreConfig;
    use supermart_core::{MemoryRepository, Repository, Store};
    use supermart_types::{Choice, Decision, MeterDelta};

    use super::*;

    fn store_with_decision() -> Store<MemoryRepository, StdRng> {
        let mut repo = MemoryRepository::new();
        let player = repo.create_player("You").unwrap();
        let mut store =
            Store::new(&StoreConfig::default(), repo, StdRng::seed_from_u64(3)).unwrap();
        store.start_session(player.id).unwrap();
        store
            .present_decision(Decision {
                description: "Supplier offers bulk discount!".to_owned(),
                left: Choice::new("Buy More", MeterDelta::new(30, 0, -20, 0)),
                right: Choice::new("Decline", MeterDelta::ZERO),
                item_id: None,
            })
            .unwrap();
        store
    }

    #[test]
    fn random_player_waits_for_reaction_delay() {
        let store = store_with_decision();
        let pending = store.pending_decisions();
        let mut player = RandomPlayer::new(1, Duration::from_secs(3));

        assert!(player.answer(&pending, GameInstant::from_millis(2_999)).is_empty());
        let answers = player.answer(&pending, GameInstant::from_millis(3_000));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.first().unwrap().0, pending.first().unwrap().id);
    }

    #[test]
    fn idle_player_never_answers() {
        let store = store_with_decision();
        let pending = store.pending_decisions();
        assert!(
            IdlePlayer
                .answer(&pending, GameInstant::from_millis(60_000))
                .is_empty()
        );
    }

    #[test]
    fn missing_section_uses_defaults() {
        let config = AutopilotConfig::load(Path::new("does-not-exist.yaml")).unwrap();
        assert_eq!(config, AutopilotConfig::default());
        assert_eq!(config.reaction_ms, 3_000);
    }

    #[test]
    fn section_parses_from_yaml() {
        let config: AutopilotConfig = serde_yml::from_str("mode: idle\n").unwrap();
        assert_eq!(config.mode, AutopilotMode::Idle);
        assert_eq!(config.reaction_ms, 3_000);
    }
}
