//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and adds context for rows that cannot be decoded back
//! into domain types.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A migration failed.
    #[error("SQLite migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be turned back into a domain value.
    #[error("cannot decode column {column}: {reason}")]
    Decode {
        /// The offending column.
        column: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Shorthand for [`DbError::Decode`].
    pub fn decode(column: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            column,
            reason: reason.to_string(),
        }
    }
}

/// Convert a stored integer into an unsigned domain count.
pub(crate) fn to_u32(column: &'static str, value: i64) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::decode(column, e))
}

/// Convert a stored integer into a signed meter value.
pub(crate) fn to_i32(column: &'static str, value: i64) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|e| DbError::decode(column, e))
}

/// Parse a decimal stored as text.
pub(crate) fn to_decimal(
    column: &'static str,
    value: &str,
) -> Result<rust_decimal::Decimal, DbError> {
    value
        .parse::<rust_decimal::Decimal>()
        .map_err(|e| DbError::decode(column, e))
}
