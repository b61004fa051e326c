//! Decision history persistence.
//!
//! One `decision_logs` row per resolved presentation, whether the player
//! chose or the timeout fired. The resolution is split into the side that
//! was applied and a timed-out flag.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use supermart_types::{
    ChoiceSide, DecisionLog, DecisionLogId, ItemId, MeterDelta, PlayerId, Resolution,
};

use crate::error::{DbError, to_i32, to_u32};

/// Operations on the `decision_logs` table.
pub struct DecisionStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DecisionStore<'a> {
    /// Create a new decision store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append decision log entries. Rows already present are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn insert_decisions(
        conn: &mut SqliteConnection,
        logs: &[DecisionLog],
    ) -> Result<(), DbError> {
        for log in logs {
            sqlx::query(
                r"INSERT INTO decision_logs
                  (id, player_id, description, side, timed_out, item_id,
                   stock_delta, satisfaction_delta, profit_delta, morale_delta, day, decided_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(log.id.get())
            .bind(log.player_id.get())
            .bind(&log.description)
            .bind(log.resolution.side().as_str())
            .bind(log.resolution.timed_out())
            .bind(log.item_id.map(ItemId::get))
            .bind(log.delta.stock)
            .bind(log.delta.satisfaction)
            .bind(log.delta.profit)
            .bind(log.delta.morale)
            .bind(i64::from(log.day))
            .bind(log.decided_at)
            .execute(&mut *conn)
            .await?;
        }
        if !logs.is_empty() {
            tracing::debug!(count = logs.len(), "Inserted decision logs");
        }
        Ok(())
    }

    /// Every decision shown to a player, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn decisions_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<DecisionLog>, DbError> {
        let rows = sqlx::query_as::<_, DecisionLogRow>(
            r"SELECT id, player_id, description, side, timed_out, item_id,
                     stock_delta, satisfaction_delta, profit_delta, morale_delta, day, decided_at
              FROM decision_logs
              WHERE player_id = $1
              ORDER BY id",
        )
        .bind(player_id.get())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(DecisionLog::try_from).collect()
    }
}

/// A row from the `decision_logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DecisionLogRow {
    /// Log id.
    pub id: i64,
    /// Player the decision was shown to.
    pub player_id: i64,
    /// Decision prompt.
    pub description: String,
    /// Side applied (`left` or `right`).
    pub side: String,
    /// Whether the timeout chose the side.
    pub timed_out: bool,
    /// Item the decision concerned.
    pub item_id: Option<i64>,
    /// Stock delta applied.
    pub stock_delta: i64,
    /// Satisfaction delta applied.
    pub satisfaction_delta: i64,
    /// Profit delta applied.
    pub profit_delta: i64,
    /// Morale delta applied.
    pub morale_delta: i64,
    /// Game day of resolution.
    pub day: i64,
    /// Resolution time.
    pub decided_at: DateTime<Utc>,
}

impl TryFrom<DecisionLogRow> for DecisionLog {
    type Error = DbError;

    fn try_from(row: DecisionLogRow) -> Result<Self, Self::Error> {
        let side = ChoiceSide::from_str(&row.side).map_err(|e| DbError::decode("side", e))?;
        let resolution = match (row.timed_out, side) {
            (true, ChoiceSide::Right) => Resolution::TimedOut,
            (true, ChoiceSide::Left) => {
                return Err(DbError::decode("timed_out", "timeout applied the left branch"));
            }
            (false, side) => Resolution::Chosen(side),
        };
        Ok(Self {
            id: DecisionLogId::new(row.id),
            player_id: PlayerId::new(row.player_id),
            description: row.description,
            resolution,
            item_id: row.item_id.map(ItemId::new),
            delta: MeterDelta::new(
                to_i32("stock_delta", row.stock_delta)?,
                to_i32("satisfaction_delta", row.satisfaction_delta)?,
                to_i32("profit_delta", row.profit_delta)?,
                to_i32("morale_delta", row.morale_delta)?,
            ),
            day: to_u32("day", row.day)?,
            decided_at: row.decided_at,
        })
    }
}
