//! The storage boundary consumed by the store controller.
//!
//! [`Repository`] is pure data access: it validates shapes (positive ids,
//! positive quantities, non-negative stock) but applies no game rules.
//! Every call is synchronous from the controller's point of view and fails
//! with a tagged [`RepoError`] rather than panicking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use supermart_types::{
    Customer, CustomerId, DecisionLog, GameOverReason, GameSession, Item, ItemId, MeterDelta,
    MeterSnapshot, OrderStatus, Player, PlayerId, Resolution, SessionId, ShelfPosition,
    SupplierOrder, Transaction,
};
use tracing::info;

use crate::config::CatalogItem;

/// Tagged repository failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    /// The referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// An argument failed shape validation.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },

    /// The backing store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },
}

impl RepoError {
    /// Shorthand for [`RepoError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`RepoError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// A product to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// Product name.
    pub name: String,
    /// Initial shelf stock.
    pub stock_level: u32,
    /// Price per unit; must be positive.
    pub unit_price: Decimal,
    /// Shelf location.
    pub shelf: ShelfPosition,
}

/// A purchase to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Buyer.
    pub customer_id: CustomerId,
    /// Item bought.
    pub item_id: ItemId,
    /// Units bought; must be positive.
    pub quantity: u32,
    /// Total price paid.
    pub total_cost: Decimal,
    /// Purchase time.
    pub purchased_at: DateTime<Utc>,
    /// Satisfaction credited.
    pub satisfaction_change: i32,
}

/// A resolved decision to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDecisionLog {
    /// Player the decision was shown to.
    pub player_id: PlayerId,
    /// Decision prompt.
    pub description: String,
    /// Side applied and whether it timed out.
    pub resolution: Resolution,
    /// Item the decision concerned.
    pub item_id: Option<ItemId>,
    /// Applied deltas.
    pub delta: MeterDelta,
    /// Game day of resolution.
    pub day: u32,
    /// Resolution time.
    pub decided_at: DateTime<Utc>,
}

/// A supplier order to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupplierOrder {
    /// Item restocked.
    pub item_id: ItemId,
    /// Units ordered; must be positive.
    pub quantity: u32,
    /// Order cost.
    pub cost: Decimal,
    /// Order time.
    pub ordered_at: DateTime<Utc>,
    /// Initial status.
    pub status: OrderStatus,
}

/// Values written when a session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnd {
    /// Why the session ended.
    pub reason: GameOverReason,
    /// Meters at the end.
    pub final_meters: MeterSnapshot,
    /// Last day reached.
    pub final_day: u32,
    /// Close time.
    pub ended_at: DateTime<Utc>,
}

/// Abstract storage for the entities the store owns.
pub trait Repository {
    /// Insert a product.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for an empty name or non-positive price.
    fn create_item(&mut self, item: NewItem) -> Result<Item, RepoError>;

    /// Fetch a product.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent.
    fn get_item(&self, id: ItemId) -> Result<Item, RepoError>;

    /// Every product, in id order.
    ///
    /// # Errors
    ///
    /// [`RepoError::Storage`] if the store cannot be read.
    fn list_items(&self) -> Result<Vec<Item>, RepoError>;

    /// Add `delta` units to a product's shelf stock.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent, [`RepoError::InvalidArgument`] if
    /// the stock would go negative.
    fn update_item_stock(&mut self, id: ItemId, delta: i32) -> Result<Item, RepoError>;

    /// Take `quantity` units off the shelf and count them as sold.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent, [`RepoError::InvalidArgument`] for
    /// a zero quantity or more units than are on the shelf.
    fn record_sale(&mut self, id: ItemId, quantity: u32) -> Result<Item, RepoError>;

    /// Products with fewer than `threshold` units, in id order.
    ///
    /// # Errors
    ///
    /// [`RepoError::Storage`] if the store cannot be read.
    fn list_low_stock(&self, threshold: u32) -> Result<Vec<Item>, RepoError>;

    /// Insert a customer and return the new id.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for an empty name.
    fn create_customer(&mut self, name: &str, loyalty_points: u32)
    -> Result<CustomerId, RepoError>;

    /// Fetch a customer.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent.
    fn get_customer(&self, id: CustomerId) -> Result<Customer, RepoError>;

    /// Append a purchase.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for non-positive ids or quantity.
    fn record_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, RepoError>;

    /// Append a resolved decision.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for a non-positive player id.
    fn record_decision(&mut self, log: NewDecisionLog) -> Result<DecisionLog, RepoError>;

    /// Insert a player profile.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for an empty or duplicate username.
    fn create_player(&mut self, username: &str) -> Result<Player, RepoError>;

    /// Fetch a player.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent.
    fn get_player(&self, id: PlayerId) -> Result<Player, RepoError>;

    /// Look a player up by username.
    ///
    /// # Errors
    ///
    /// [`RepoError::Storage`] if the store cannot be read.
    fn find_player(&self, username: &str) -> Result<Option<Player>, RepoError>;

    /// Record the number of days a player has survived.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent.
    fn update_player_days(&mut self, id: PlayerId, days: u32) -> Result<Player, RepoError>;

    /// Open a session with the starting meter snapshot.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for an unknown player.
    fn start_session(
        &mut self,
        player_id: PlayerId,
        started_at: DateTime<Utc>,
    ) -> Result<GameSession, RepoError>;

    /// Close a session with its final snapshot.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for an unknown session,
    /// [`RepoError::InvalidArgument`] if it is already closed.
    fn end_session(&mut self, id: SessionId, end: SessionEnd) -> Result<GameSession, RepoError>;

    /// Fetch a session.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] if absent.
    fn get_session(&self, id: SessionId) -> Result<GameSession, RepoError>;

    /// The player's open session, if any.
    ///
    /// # Errors
    ///
    /// [`RepoError::Storage`] if the store cannot be read.
    fn open_session(&self, player_id: PlayerId) -> Result<Option<GameSession>, RepoError>;

    /// Append a supplier order.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidArgument`] for a non-positive item id or quantity.
    fn create_supplier_order(
        &mut self,
        order: NewSupplierOrder,
    ) -> Result<SupplierOrder, RepoError>;
}

/// Reject non-positive row ids.
///
/// # Errors
///
/// [`RepoError::InvalidArgument`] naming `what`.
pub fn require_valid_id(valid: bool, what: &str) -> Result<(), RepoError> {
    if valid {
        Ok(())
    } else {
        Err(RepoError::invalid(format!("{what} must be positive")))
    }
}

/// Insert every catalog item into an empty repository.
///
/// Does nothing if the repository already holds items, so a resumed store
/// keeps its stock levels.
///
/// # Errors
///
/// Any error from [`Repository::list_items`] or [`Repository::create_item`].
pub fn seed_catalog<R: Repository + ?Sized>(
    repo: &mut R,
    catalog: &[CatalogItem],
) -> Result<Vec<Item>, RepoError> {
    let existing = repo.list_items()?;
    if !existing.is_empty() {
        return Ok(existing);
    }
    let items = catalog
        .iter()
        .map(|entry| {
            repo.create_item(NewItem {
                name: entry.name.clone(),
                stock_level: entry.stock_level,
                unit_price: entry.unit_price,
                shelf: ShelfPosition {
                    x: entry.x,
                    y: entry.y,
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!(items = items.len(), "Catalog seeded");
    Ok(items)
}
