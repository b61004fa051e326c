//! Headless engine binary for the Supermart store simulation.
//!
//! Wires the store controller to `SQLite` and a scripted player, then runs
//! one session in real time until the store fails, the day limit passes,
//! or the operator stops it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `supermart-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `SQLite` and run migrations
//! 4. Hydrate the in-memory repository
//! 5. Seed the catalog and player on first run
//! 6. Build the store and open a session
//! 7. Run the loop
//! 8. Log the result

mod autopilot;
mod error;
mod runner;

use std::path::Path;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use supermart_core::config::{LogFormat, LoggingConfig, StoreConfig};
use supermart_core::repository::seed_catalog;
use supermart_core::{MemoryRepository, Repository, Store};
use supermart_db::{SqliteConfig, StorePool, load_hydration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::autopilot::AutopilotConfig;
use crate::error::EngineError;
use crate::runner::RunSettings;

/// Config file looked up in the working directory.
const CONFIG_PATH: &str = "supermart-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the run loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration (logging depends on it).
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("supermart-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        player = config.game.player_username.as_str(),
        seed = config.game.seed,
        day_duration_ms = config.game.day_duration_ms,
        crisis_interval_ms = config.game.crisis_interval_ms,
        decision_timeout_ms = config.game.decision_timeout_ms,
        time_scale = config.game.time_scale,
        "Configuration loaded"
    );

    // 3. Connect to SQLite.
    let db_config = SqliteConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections)
        .with_connect_timeout(config.database.connect_timeout());
    let pool = StorePool::connect(&db_config)
        .await
        .map_err(EngineError::from)?;
    pool.run_migrations().await.map_err(EngineError::from)?;

    // 4. Hydrate the hot store.
    let hydration = load_hydration(pool.pool())
        .await
        .map_err(EngineError::from)?;
    let mut repo = MemoryRepository::hydrated(hydration);

    // 5. Seed catalog and player.
    let items = seed_catalog(&mut repo, &config.catalog).map_err(EngineError::from)?;
    let username = config.game.player_username.as_str();
    let player = match repo.find_player(username).map_err(EngineError::from)? {
        Some(player) => {
            info!(player_id = %player.id, username, "Returning player");
            player
        }
        None => {
            let player = repo.create_player(username).map_err(EngineError::from)?;
            info!(player_id = %player.id, username, "Player created");
            player
        }
    };
    info!(items = items.len(), "Store catalog ready");

    // 6. Build the store and open a session.
    let rng = StdRng::seed_from_u64(config.game.seed);
    let mut store = Store::new(&config, repo, rng).map_err(EngineError::from)?;
    store.start_session(player.id).map_err(EngineError::from)?;

    let autopilot = AutopilotConfig::load(Path::new(CONFIG_PATH))?;
    info!(mode = ?autopilot.mode, reaction_ms = autopilot.reaction_ms, "Autopilot ready");
    let mut player_policy = autopilot.build(config.game.seed.wrapping_add(1));

    // 7. Run.
    let settings = RunSettings {
        tick_interval: Duration::from_millis(config.game.tick_interval_ms),
        time_scale: config.game.time_scale,
        max_days: config.game.max_days,
    };
    let summary = runner::run_store(&mut store, &pool, player_policy.as_mut(), settings)
        .await
        .map_err(EngineError::from)?;

    // 8. Log results.
    runner::log_run_end(&summary);
    pool.close().await;
    info!("supermart-engine shutdown complete");

    Ok(())
}

/// Load the store configuration from `supermart-config.yaml`.
///
/// Falls back to the defaults when the file is absent. `DATABASE_URL`
/// overrides the database URL either way.
fn load_config() -> Result<(StoreConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((StoreConfig::from_file(config_path)?, true))
    } else {
        let mut config = StoreConfig::default();
        config.database.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
    }
}
