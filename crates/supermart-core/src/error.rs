//! Error taxonomy surfaced by the store controller.

use supermart_types::{ItemId, PresentationId};

use crate::clock::ClockError;
use crate::decision::DecisionError;
use crate::repository::RepoError;

/// Errors returned by [`crate::controller::Store`] commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A non-positive id or quantity was supplied.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },

    /// A referenced item, customer, or session does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row.
        entity: &'static str,
        /// The identifier looked up.
        id: String,
    },

    /// The item has fewer units than requested.
    #[error("item {item_id} has {available} units, {requested} requested")]
    InsufficientStock {
        /// The item.
        item_id: ItemId,
        /// Units on the shelf.
        available: u32,
        /// Units requested.
        requested: u32,
    },

    /// The repository failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },

    /// The presentation was already resolved.
    #[error("presentation {0} is already resolved")]
    AlreadyResolved(PresentationId),

    /// The player already has an open session.
    #[error("player already has an open session")]
    SessionAlreadyOpen,

    /// The game has ended; the command was ignored.
    #[error("the game is over")]
    GameOver,

    /// No session has been started.
    #[error("no active session")]
    NoActiveSession,

    /// The game clock could not be advanced.
    #[error(transparent)]
    Clock(#[from] ClockError),
}

impl From<RepoError> for StoreError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::InvalidArgument { reason } => Self::InvalidArgument { reason },
            RepoError::Storage { message } => Self::Storage { message },
        }
    }
}

impl From<DecisionError> for StoreError {
    fn from(err: DecisionError) -> Self {
        match err {
            DecisionError::AlreadyResolved(id) => Self::AlreadyResolved(id),
            DecisionError::UnknownPresentation(id) => Self::NotFound {
                entity: "presentation",
                id: id.to_string(),
            },
            DecisionError::EmptyCatalog => Self::InvalidArgument {
                reason: err.to_string(),
            },
        }
    }
}

impl StoreError {
    /// Shorthand for [`StoreError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
