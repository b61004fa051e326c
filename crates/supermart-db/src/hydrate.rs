//! Rebuilding the in-memory repository from `SQLite` at startup.
//!
//! Items and players are loaded in full. Only closed sessions are loaded:
//! a session left open by a crashed process stays open on disk and is not
//! resumed, so the player can start a fresh one. Append-only tables are
//! not loaded; their id watermarks are, so new rows never collide.

use sqlx::SqlitePool;
use supermart_core::{Hydration, IdWatermarks};

use crate::error::DbError;
use crate::inventory_store::InventoryStore;
use crate::session_store::SessionStore;

/// Highest stored id per table (zero for an empty table).
///
/// # Errors
///
/// Returns [`DbError::Sqlite`] if a query fails.
pub async fn load_watermarks(pool: &SqlitePool) -> Result<IdWatermarks, DbError> {
    Ok(IdWatermarks {
        item: max_id(pool, "items").await?,
        customer: max_id(pool, "customers").await?,
        transaction: max_id(pool, "transactions").await?,
        decision: max_id(pool, "decision_logs").await?,
        supplier_order: max_id(pool, "supplier_orders").await?,
        player: max_id(pool, "players").await?,
    })
}

async fn max_id(pool: &SqlitePool, table: &'static str) -> Result<i64, DbError> {
    let sql = format!("SELECT COALESCE(MAX(id), 0) FROM {table}");
    let max: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
    Ok(max)
}

/// Everything needed to resume a [`supermart_core::MemoryRepository`].
///
/// # Errors
///
/// Returns [`DbError`] if a query fails or a row cannot be decoded.
pub async fn load_hydration(pool: &SqlitePool) -> Result<Hydration, DbError> {
    let inventory = InventoryStore::new(pool);
    let sessions = SessionStore::new(pool);

    let hydration = Hydration {
        items: inventory.load_items().await?,
        players: inventory.load_players().await?,
        sessions: sessions.load_closed_sessions().await?,
        watermarks: load_watermarks(pool).await?,
    };

    let abandoned = sessions.count_open_sessions().await?;
    if abandoned > 0 {
        tracing::warn!(abandoned, "Sessions left open by a previous run were not resumed");
    }
    tracing::info!(
        items = hydration.items.len(),
        players = hydration.players.len(),
        sessions = hydration.sessions.len(),
        "Loaded store state from SQLite"
    );
    Ok(hydration)
}
