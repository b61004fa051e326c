//! Real-time run loop for one store session.
//!
//! Each iteration of [`run_store`]:
//!
//! 1. waits for the next interval tick (or Ctrl-C),
//! 2. measures real elapsed time with a monotonic [`Instant`] and scales it
//!    by `time_scale`,
//! 3. ticks the store, firing every due day, crisis, customer, and timeout
//!    task,
//! 4. lets the scripted player answer decisions on screen,
//! 5. logs the drained store events,
//! 6. flushes the repository journal to `SQLite`.
//!
//! The loop ends when the game is over, when `max_days` is exceeded, or on
//! Ctrl-C. A failed flush is logged and the journal is requeued for the
//! next iteration.

use std::time::Duration;

use rand::Rng;
use supermart_core::{MemoryRepository, Store, StoreError, StoreEvent};
use supermart_db::StorePool;
use supermart_types::{GameOverReason, MeterState};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::autopilot::PlayerPolicy;

/// Pacing and bounds for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Real time between loop iterations.
    pub tick_interval: Duration,
    /// Game milliseconds per real millisecond.
    pub time_scale: u32,
    /// Stop after this many days (0 = unbounded).
    pub max_days: u32,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// A meter reached zero.
    GameOver(GameOverReason),
    /// The configured day limit was passed.
    MaxDaysReached,
    /// The operator pressed Ctrl-C.
    Interrupted,
}

/// Result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the run stopped.
    pub end_reason: RunEndReason,
    /// Meters when it stopped.
    pub final_state: MeterState,
    /// Loop iterations executed.
    pub iterations: u64,
    /// Decisions answered by the scripted player.
    pub answered: u64,
    /// Rows written to `SQLite`.
    pub rows_persisted: usize,
}

/// Scale real elapsed time into game time.
pub fn scaled_elapsed(real: Duration, time_scale: u32) -> Duration {
    real.saturating_mul(time_scale.max(1))
}

/// Whether the day limit has been passed.
pub const fn past_day_limit(state: &MeterState, max_days: u32) -> bool {
    max_days > 0 && state.day > max_days
}

/// Let `player` answer whatever is on screen. Returns how many answers
/// the store accepted.
pub fn answer_pending<G: Rng>(
    store: &mut Store<MemoryRepository, G>,
    player: &mut dyn PlayerPolicy,
) -> u64 {
    let answers = {
        let pending = store.pending_decisions();
        if pending.is_empty() {
            return 0;
        }
        player.answer(&pending, store.now())
    };
    let mut accepted: u64 = 0;
    for (id, side) in answers {
        match store.resolve_decision(id, side) {
            Ok(_) => accepted = accepted.saturating_add(1),
            Err(StoreError::AlreadyResolved(_)) => {
                debug!(%id, "Answer arrived after resolution");
            }
            Err(err) => warn!(%id, %side, %err, "Scripted answer rejected"),
        }
    }
    accepted
}

/// Write every drained event to the log as JSON.
pub fn log_events(events: Vec<StoreEvent>) {
    for event in events {
        match serde_json::to_string(&event) {
            Ok(json) => debug!(target: "supermart::events", event = %json, "Store event"),
            Err(err) => warn!(%err, "Store event could not be serialized"),
        }
    }
}

/// Flush the repository journal. On failure the journal is put back and
/// zero is returned.
pub async fn flush_journal<G: Rng>(
    store: &mut Store<MemoryRepository, G>,
    pool: &StorePool,
) -> usize {
    let journal = store.repository_mut().take_journal();
    if journal.is_empty() {
        return 0;
    }
    match supermart_db::persist_journal(pool.pool(), &journal).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%err, rows = journal.len(), "Journal flush failed; will retry");
            store.repository_mut().requeue_journal(journal);
            0
        }
    }
}

/// Drive `store` in real time until the game ends, the day limit passes,
/// or Ctrl-C.
///
/// # Errors
///
/// Returns [`StoreError::Clock`] if game time overflows.
pub async fn run_store<G: Rng>(
    store: &mut Store<MemoryRepository, G>,
    pool: &StorePool,
    player: &mut dyn PlayerPolicy,
    settings: RunSettings,
) -> Result<RunSummary, StoreError> {
    let mut interval = tokio::time::interval(settings.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last = Instant::now();
    let mut iterations: u64 = 0;
    let mut answered: u64 = 0;
    let mut rows_persisted = flush_journal(store, pool).await;

    info!(
        tick_interval_ms = settings.tick_interval.as_millis(),
        time_scale = settings.time_scale,
        max_days = settings.max_days,
        "Run loop starting"
    );

    let end_reason = loop {
        tokio::select! {
            _ = interval.tick() => {}
            signal = &mut shutdown => {
                if let Err(err) = signal {
                    error!(%err, "Ctrl-C handler failed; stopping");
                }
                info!("Interrupt received");
                break RunEndReason::Interrupted;
            }
        }

        let now = Instant::now();
        let elapsed = scaled_elapsed(now.saturating_duration_since(last), settings.time_scale);
        last = now;
        iterations = iterations.saturating_add(1);

        store.tick(elapsed)?;
        answered = answered.saturating_add(answer_pending(store, player));
        log_events(store.drain_events());
        rows_persisted = rows_persisted.saturating_add(flush_journal(store, pool).await);

        let state = store.state();
        if let Some(reason) = state.game_over_reason {
            break RunEndReason::GameOver(reason);
        }
        if past_day_limit(&state, settings.max_days) {
            info!(day = state.day, max_days = settings.max_days, "Day limit reached");
            break RunEndReason::MaxDaysReached;
        }
    };

    // Timeouts still pending after game over fire here so they are logged.
    if matches!(end_reason, RunEndReason::GameOver(_)) {
        while let Some(deadline) = store.next_deadline() {
            store.tick(deadline.saturating_since(store.now()))?;
        }
        log_events(store.drain_events());
    }
    rows_persisted = rows_persisted.saturating_add(flush_journal(store, pool).await);

    Ok(RunSummary {
        end_reason,
        final_state: store.state(),
        iterations,
        answered,
        rows_persisted,
    })
}

/// Log the outcome of a run.
pub fn log_run_end(summary: &RunSummary) {
    let state = summary.final_state;
    info!(
        end_reason = ?summary.end_reason,
        day = state.day,
        stock = state.stock,
        satisfaction = state.satisfaction,
        profit = state.profit,
        morale = state.morale,
        iterations = summary.iterations,
        answered = summary.answered,
        rows_persisted = summary.rows_persisted,
        "Run finished"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use supermart_core::Repository;
    use supermart_core::config::StoreConfig;
    use supermart_types::{ChoiceSide, PresentationId};

    use super::*;
    use crate::autopilot::{IdlePlayer, RandomPlayer};

    fn started_store() -> Store<MemoryRepository, StdRng> {
        let mut repo = MemoryRepository::new();
        let player = repo.create_player("You").unwrap();
        let mut store =
            Store::new(&StoreConfig::default(), repo, StdRng::seed_from_u64(9)).unwrap();
        store.start_session(player.id).unwrap();
        store
    }

    struct AnswerTwice;

    impl PlayerPolicy for AnswerTwice {
        fn answer(
            &mut self,
            pending: &[&supermart_core::decision::Presentation],
            _now: supermart_core::clock::GameInstant,
        ) -> Vec<(PresentationId, ChoiceSide)> {
            pending
                .iter()
                .flat_map(|p| [(p.id, ChoiceSide::Left), (p.id, ChoiceSide::Right)])
                .collect()
        }
    }

    #[test]
    fn elapsed_is_scaled() {
        assert_eq!(
            scaled_elapsed(Duration::from_millis(100), 10),
            Duration::from_secs(1)
        );
        assert_eq!(
            scaled_elapsed(Duration::from_millis(100), 0),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn day_limit_zero_is_unbounded() {
        let mut state = MeterState::initial();
        state.day = 500;
        assert!(!past_day_limit(&state, 0));
        assert!(past_day_limit(&state, 499));
        assert!(!past_day_limit(&state, 500));
    }

    #[test]
    fn only_first_answer_counts() {
        let mut store = started_store();
        store.present_random_crisis().unwrap();
        let accepted = answer_pending(&mut store, &mut AnswerTwice);
        assert_eq!(accepted, 1);
        assert!(store.pending_decisions().is_empty());
        assert_eq!(store.repository().decisions().len(), 1);
    }

    #[test]
    fn idle_player_leaves_decisions_to_time_out() {
        let mut store = started_store();
        store.present_random_crisis().unwrap();
        assert_eq!(answer_pending(&mut store, &mut IdlePlayer), 0);
        assert_eq!(store.pending_decisions().len(), 1);
    }

    #[test]
    fn random_player_answers_after_reaction() {
        let mut store = started_store();
        store.present_random_crisis().unwrap();
        let mut player = RandomPlayer::new(4, Duration::from_secs(2));
        assert_eq!(answer_pending(&mut store, &mut player), 0);
        store.tick(Duration::from_secs(2)).unwrap();
        assert_eq!(answer_pending(&mut store, &mut player), 1);
    }
}
