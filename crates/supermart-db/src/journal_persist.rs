//! Flushing the in-memory write journal to `SQLite`.
//!
//! The engine drains [`Journal`]s from the hot in-memory repository and
//! hands them here. A journal is written in a single transaction, parents
//! before children, so a failed flush leaves no partial rows and the
//! journal can be requeued as a whole.
//!
//! # Order
//!
//! ```text
//! BEGIN
//!   items, players, customers       (parents)
//!   transactions, decision_logs,
//!   game_sessions, supplier_orders  (children)
//! COMMIT
//! ```

use sqlx::SqlitePool;
use supermart_core::Journal;

use crate::decision_store::DecisionStore;
use crate::error::DbError;
use crate::inventory_store::InventoryStore;
use crate::ledger_store::LedgerStore;
use crate::session_store::SessionStore;

/// Errors that can occur during journal persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// A write inside the flush transaction failed.
    #[error("journal write failed at {stage}: {source}")]
    Write {
        /// The table group being written.
        stage: &'static str,
        /// The underlying failure.
        source: DbError,
    },

    /// The transaction could not be opened or committed.
    #[error("journal transaction failed: {0}")]
    Transaction(#[from] DbError),
}

fn at(stage: &'static str) -> impl FnOnce(DbError) -> PersistError {
    move |source| PersistError::Write { stage, source }
}

/// Write every row of `journal` in one transaction.
///
/// Returns the number of rows written. An empty journal is a no-op.
///
/// # Errors
///
/// Returns [`PersistError::Write`] naming the failing table group, or
/// [`PersistError::Transaction`] if the transaction itself fails. Nothing
/// is committed in either case.
pub async fn persist_journal(pool: &SqlitePool, journal: &Journal) -> Result<usize, PersistError> {
    if journal.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.map_err(DbError::from)?;

    InventoryStore::upsert_items(&mut tx, &journal.items)
        .await
        .map_err(at("items"))?;
    InventoryStore::upsert_players(&mut tx, &journal.players)
        .await
        .map_err(at("players"))?;
    InventoryStore::insert_customers(&mut tx, &journal.customers)
        .await
        .map_err(at("customers"))?;
    LedgerStore::insert_transactions(&mut tx, &journal.transactions)
        .await
        .map_err(at("transactions"))?;
    DecisionStore::insert_decisions(&mut tx, &journal.decisions)
        .await
        .map_err(at("decision_logs"))?;
    SessionStore::upsert_sessions(&mut tx, &journal.sessions)
        .await
        .map_err(at("game_sessions"))?;
    LedgerStore::insert_supplier_orders(&mut tx, &journal.supplier_orders)
        .await
        .map_err(at("supplier_orders"))?;

    tx.commit().await.map_err(DbError::from)?;

    let rows = journal.len();
    tracing::debug!(
        rows,
        items = journal.items.len(),
        transactions = journal.transactions.len(),
        decisions = journal.decisions.len(),
        sessions = journal.sessions.len(),
        "Persisted journal to SQLite"
    );
    Ok(rows)
}
