//! Game session persistence.
//!
//! A session row is written when the session opens and rewritten when it
//! closes with the final meters, day, and game-over reason.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use supermart_types::{GameOverReason, GameSession, MeterSnapshot, PlayerId, SessionId};
use uuid::Uuid;

use crate::error::{DbError, to_i32, to_u32};

/// Column list shared by the session reads.
const SESSION_COLUMNS: &str = "id, player_id, started_at, ended_at, end_reason, \
     final_stock, final_satisfaction, final_profit, final_morale, final_day";

/// Operations on the `game_sessions` table.
pub struct SessionStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionStore<'a> {
    /// Create a new session store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or update every session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn upsert_sessions(
        conn: &mut SqliteConnection,
        sessions: &[GameSession],
    ) -> Result<(), DbError> {
        for session in sessions {
            sqlx::query(
                r"INSERT INTO game_sessions
                  (id, player_id, started_at, ended_at, end_reason,
                   final_stock, final_satisfaction, final_profit, final_morale, final_day)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                  ON CONFLICT (id) DO UPDATE SET
                    ended_at = excluded.ended_at,
                    end_reason = excluded.end_reason,
                    final_stock = excluded.final_stock,
                    final_satisfaction = excluded.final_satisfaction,
                    final_profit = excluded.final_profit,
                    final_morale = excluded.final_morale,
                    final_day = excluded.final_day",
            )
            .bind(session.id.into_inner())
            .bind(session.player_id.get())
            .bind(session.started_at)
            .bind(session.ended_at)
            .bind(session.end_reason.map(GameOverReason::as_str))
            .bind(session.final_meters.stock)
            .bind(session.final_meters.satisfaction)
            .bind(session.final_meters.profit)
            .bind(session.final_meters.morale)
            .bind(i64::from(session.final_day))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// One session by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn get_session(&self, id: SessionId) -> Result<Option<GameSession>, DbError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?;
        row.map(GameSession::try_from).transpose()
    }

    /// Every closed session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn load_closed_sessions(&self) -> Result<Vec<GameSession>, DbError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions \
             WHERE ended_at IS NOT NULL ORDER BY started_at"
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(GameSession::try_from).collect()
    }

    /// Number of sessions that were never closed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn count_open_sessions(&self) -> Result<i64, DbError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM game_sessions WHERE ended_at IS NULL")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

/// A row from the `game_sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Session UUID.
    pub id: Uuid,
    /// Player.
    pub player_id: i64,
    /// Open time.
    pub started_at: DateTime<Utc>,
    /// Close time, if closed.
    pub ended_at: Option<DateTime<Utc>>,
    /// Game-over reason name, if closed.
    pub end_reason: Option<String>,
    /// Final stock meter.
    pub final_stock: i64,
    /// Final satisfaction meter.
    pub final_satisfaction: i64,
    /// Final profit meter.
    pub final_profit: i64,
    /// Final morale meter.
    pub final_morale: i64,
    /// Last day reached.
    pub final_day: i64,
}

impl TryFrom<SessionRow> for GameSession {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let end_reason = row
            .end_reason
            .as_deref()
            .map(GameOverReason::from_str)
            .transpose()
            .map_err(|e| DbError::decode("end_reason", e))?;
        Ok(Self {
            id: SessionId(row.id),
            player_id: PlayerId::new(row.player_id),
            started_at: row.started_at,
            ended_at: row.ended_at,
            end_reason,
            final_meters: MeterSnapshot {
                stock: to_i32("final_stock", row.final_stock)?,
                satisfaction: to_i32("final_satisfaction", row.final_satisfaction)?,
                profit: to_i32("final_profit", row.final_profit)?,
                morale: to_i32("final_morale", row.final_morale)?,
            },
            final_day: to_u32("final_day", row.final_day)?,
        })
    }
}
