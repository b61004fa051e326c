//! In-memory [`Repository`] with a write journal.
//!
//! The controller works against this hot store. Every row created or
//! changed since the last [`MemoryRepository::take_journal`] is tracked so
//! the data layer can flush it to durable storage in one batch. A failed
//! flush hands the journal back through
//! [`MemoryRepository::requeue_journal`], giving at-least-once delivery.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use supermart_types::{
    Customer, CustomerId, DecisionLog, DecisionLogId, GameSession, Item, ItemId, MeterSnapshot,
    Player, PlayerId, SessionId, SupplierOrder, SupplierOrderId, Transaction, TransactionId,
    FIRST_DAY,
};
use tracing::debug;

use crate::repository::{
    NewDecisionLog, NewItem, NewSupplierOrder, NewTransaction, RepoError, Repository, SessionEnd,
    require_valid_id,
};

/// Highest row id assigned per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdWatermarks {
    /// Items.
    pub item: i64,
    /// Customers.
    pub customer: i64,
    /// Transactions.
    pub transaction: i64,
    /// Decision log entries.
    pub decision: i64,
    /// Supplier orders.
    pub supplier_order: i64,
    /// Players.
    pub player: i64,
}

/// Rows to seed a repository with when resuming from durable storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hydration {
    /// Products.
    pub items: Vec<Item>,
    /// Player profiles.
    pub players: Vec<Player>,
    /// Sessions, open or closed.
    pub sessions: Vec<GameSession>,
    /// Id counters, so new rows do not collide with stored ones.
    pub watermarks: IdWatermarks,
}

/// Rows created or changed since the last drain.
///
/// `items`, `players`, and `sessions` hold the latest version of each
/// changed row (upserts); the other tables are append-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    /// Changed products.
    pub items: Vec<Item>,
    /// New customers.
    pub customers: Vec<Customer>,
    /// New purchases.
    pub transactions: Vec<Transaction>,
    /// New decision log entries.
    pub decisions: Vec<DecisionLog>,
    /// Opened or closed sessions.
    pub sessions: Vec<GameSession>,
    /// New supplier orders.
    pub supplier_orders: Vec<SupplierOrder>,
    /// Changed players.
    pub players: Vec<Player>,
}

impl Journal {
    /// Whether there is nothing to flush.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.customers.is_empty()
            && self.transactions.is_empty()
            && self.decisions.is_empty()
            && self.sessions.is_empty()
            && self.supplier_orders.is_empty()
            && self.players.is_empty()
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        [
            self.items.len(),
            self.customers.len(),
            self.transactions.len(),
            self.decisions.len(),
            self.sessions.len(),
            self.supplier_orders.len(),
            self.players.len(),
        ]
        .into_iter()
        .fold(0_usize, usize::saturating_add)
    }
}

#[derive(Debug, Clone, Default)]
struct Pending {
    items: BTreeSet<ItemId>,
    players: BTreeSet<PlayerId>,
    sessions: BTreeSet<SessionId>,
    customers: Vec<Customer>,
    transactions: Vec<Transaction>,
    decisions: Vec<DecisionLog>,
    supplier_orders: Vec<SupplierOrder>,
}

/// Hot in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    items: BTreeMap<ItemId, Item>,
    customers: BTreeMap<CustomerId, Customer>,
    transactions: Vec<Transaction>,
    decisions: Vec<DecisionLog>,
    sessions: BTreeMap<SessionId, GameSession>,
    supplier_orders: Vec<SupplierOrder>,
    players: BTreeMap<PlayerId, Player>,
    watermarks: IdWatermarks,
    pending: Pending,
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository resumed from durable rows. Nothing is journaled.
    pub fn hydrated(hydration: Hydration) -> Self {
        let mut repo = Self::new();
        let mut watermarks = hydration.watermarks;
        for item in hydration.items {
            watermarks.item = watermarks.item.max(item.id.get());
            repo.items.insert(item.id, item);
        }
        for player in hydration.players {
            watermarks.player = watermarks.player.max(player.id.get());
            repo.players.insert(player.id, player);
        }
        for session in hydration.sessions {
            repo.sessions.insert(session.id, session);
        }
        repo.watermarks = watermarks;
        debug!(
            items = repo.items.len(),
            players = repo.players.len(),
            sessions = repo.sessions.len(),
            "Repository hydrated"
        );
        repo
    }

    /// Current id counters.
    pub const fn watermarks(&self) -> IdWatermarks {
        self.watermarks
    }

    /// Every purchase recorded in this process.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Every decision logged in this process.
    pub fn decisions(&self) -> &[DecisionLog] {
        &self.decisions
    }

    /// Every supplier order placed in this process.
    pub fn supplier_orders(&self) -> &[SupplierOrder] {
        &self.supplier_orders
    }

    /// Every customer created in this process.
    pub fn customers(&self) -> impl Iterator<Item = &Customer> {
        self.customers.values()
    }

    /// Drain everything changed since the previous drain.
    pub fn take_journal(&mut self) -> Journal {
        let pending = std::mem::take(&mut self.pending);
        Journal {
            items: pending
                .items
                .iter()
                .filter_map(|id| self.items.get(id).cloned())
                .collect(),
            customers: pending.customers,
            transactions: pending.transactions,
            decisions: pending.decisions,
            sessions: pending
                .sessions
                .iter()
                .filter_map(|id| self.sessions.get(id).cloned())
                .collect(),
            supplier_orders: pending.supplier_orders,
            players: pending
                .players
                .iter()
                .filter_map(|id| self.players.get(id).cloned())
                .collect(),
        }
    }

    /// Put an undelivered journal back so the next drain includes it.
    ///
    /// Upserted rows are re-read at the next drain, so a row changed in the
    /// meantime is written in its newest form.
    pub fn requeue_journal(&mut self, journal: Journal) {
        self.pending.items.extend(journal.items.iter().map(|i| i.id));
        self.pending.players.extend(journal.players.iter().map(|p| p.id));
        self.pending.sessions.extend(journal.sessions.iter().map(|s| s.id));

        prepend(&mut self.pending.customers, journal.customers);
        prepend(&mut self.pending.transactions, journal.transactions);
        prepend(&mut self.pending.decisions, journal.decisions);
        prepend(&mut self.pending.supplier_orders, journal.supplier_orders);
    }

    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, RepoError> {
        self.items
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("item", id))
    }
}

fn prepend<T>(pending: &mut Vec<T>, mut older: Vec<T>) {
    older.append(pending);
    *pending = older;
}

fn next_id(counter: &mut i64) -> i64 {
    *counter = counter.saturating_add(1);
    *counter
}

impl Repository for MemoryRepository {
    fn create_item(&mut self, item: NewItem) -> Result<Item, RepoError> {
        if item.name.trim().is_empty() {
            return Err(RepoError::invalid("item name must not be empty"));
        }
        if item.unit_price <= rust_decimal::Decimal::ZERO {
            return Err(RepoError::invalid("unit price must be positive"));
        }
        let id = ItemId::new(next_id(&mut self.watermarks.item));
        let row = Item {
            id,
            name: item.name,
            stock_level: item.stock_level,
            sales_count: 0,
            unit_price: item.unit_price,
            shelf: item.shelf,
        };
        self.items.insert(id, row.clone());
        self.pending.items.insert(id);
        Ok(row)
    }

    fn get_item(&self, id: ItemId) -> Result<Item, RepoError> {
        self.items
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("item", id))
    }

    fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        Ok(self.items.values().cloned().collect())
    }

    fn update_item_stock(&mut self, id: ItemId, delta: i32) -> Result<Item, RepoError> {
        let item = self.item_mut(id)?;
        let updated = i64::from(item.stock_level).saturating_add(i64::from(delta));
        let stock_level = u32::try_from(updated).map_err(|_| {
            RepoError::invalid(format!(
                "stock of item {id} cannot change by {delta} from {}",
                item.stock_level
            ))
        })?;
        item.stock_level = stock_level;
        let row = item.clone();
        self.pending.items.insert(id);
        Ok(row)
    }

    fn record_sale(&mut self, id: ItemId, quantity: u32) -> Result<Item, RepoError> {
        if quantity == 0 {
            return Err(RepoError::invalid("sale quantity must be positive"));
        }
        let item = self.item_mut(id)?;
        let stock_level = item.stock_level.checked_sub(quantity).ok_or_else(|| {
            RepoError::invalid(format!(
                "item {id} has {} units, cannot sell {quantity}",
                item.stock_level
            ))
        })?;
        item.stock_level = stock_level;
        item.sales_count = item.sales_count.saturating_add(quantity);
        let row = item.clone();
        self.pending.items.insert(id);
        Ok(row)
    }

    fn list_low_stock(&self, threshold: u32) -> Result<Vec<Item>, RepoError> {
        Ok(self
            .items
            .values()
            .filter(|item| item.stock_level < threshold)
            .cloned()
            .collect())
    }

    fn create_customer(
        &mut self,
        name: &str,
        loyalty_points: u32,
    ) -> Result<CustomerId, RepoError> {
        if name.trim().is_empty() {
            return Err(RepoError::invalid("customer name must not be empty"));
        }
        let id = CustomerId::new(next_id(&mut self.watermarks.customer));
        let row = Customer {
            id,
            name: name.to_owned(),
            loyalty_points,
        };
        self.customers.insert(id, row.clone());
        self.pending.customers.push(row);
        Ok(id)
    }

    fn get_customer(&self, id: CustomerId) -> Result<Customer, RepoError> {
        self.customers
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("customer", id))
    }

    fn record_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, RepoError> {
        require_valid_id(tx.customer_id.is_valid(), "customer id")?;
        require_valid_id(tx.item_id.is_valid(), "item id")?;
        if tx.quantity == 0 {
            return Err(RepoError::invalid("transaction quantity must be positive"));
        }
        let row = Transaction {
            id: TransactionId::new(next_id(&mut self.watermarks.transaction)),
            customer_id: tx.customer_id,
            item_id: tx.item_id,
            quantity: tx.quantity,
            total_cost: tx.total_cost,
            purchased_at: tx.purchased_at,
            satisfaction_change: tx.satisfaction_change,
        };
        self.transactions.push(row.clone());
        self.pending.transactions.push(row.clone());
        Ok(row)
    }

    fn record_decision(&mut self, log: NewDecisionLog) -> Result<DecisionLog, RepoError> {
        require_valid_id(log.player_id.is_valid(), "player id")?;
        let row = DecisionLog {
            id: DecisionLogId::new(next_id(&mut self.watermarks.decision)),
            player_id: log.player_id,
            description: log.description,
            resolution: log.resolution,
            item_id: log.item_id,
            delta: log.delta,
            day: log.day,
            decided_at: log.decided_at,
        };
        self.decisions.push(row.clone());
        self.pending.decisions.push(row.clone());
        Ok(row)
    }

    fn create_player(&mut self, username: &str) -> Result<Player, RepoError> {
        if username.trim().is_empty() {
            return Err(RepoError::invalid("username must not be empty"));
        }
        if self.players.values().any(|p| p.username == username) {
            return Err(RepoError::invalid(format!("username {username} is taken")));
        }
        let id = PlayerId::new(next_id(&mut self.watermarks.player));
        let row = Player {
            id,
            username: username.to_owned(),
            days_survived: 0,
        };
        self.players.insert(id, row.clone());
        self.pending.players.insert(id);
        Ok(row)
    }

    fn get_player(&self, id: PlayerId) -> Result<Player, RepoError> {
        self.players
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("player", id))
    }

    fn find_player(&self, username: &str) -> Result<Option<Player>, RepoError> {
        Ok(self
            .players
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    fn update_player_days(&mut self, id: PlayerId, days: u32) -> Result<Player, RepoError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("player", id))?;
        player.days_survived = days;
        let row = player.clone();
        self.pending.players.insert(id);
        Ok(row)
    }

    fn start_session(
        &mut self,
        player_id: PlayerId,
        started_at: DateTime<Utc>,
    ) -> Result<GameSession, RepoError> {
        require_valid_id(player_id.is_valid(), "player id")?;
        if !self.players.contains_key(&player_id) {
            return Err(RepoError::not_found("player", player_id));
        }
        let row = GameSession {
            id: SessionId::new(),
            player_id,
            started_at,
            ended_at: None,
            end_reason: None,
            final_meters: MeterSnapshot::default(),
            final_day: FIRST_DAY,
        };
        self.sessions.insert(row.id, row.clone());
        self.pending.sessions.insert(row.id);
        Ok(row)
    }

    fn end_session(&mut self, id: SessionId, end: SessionEnd) -> Result<GameSession, RepoError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("session", id))?;
        if !session.is_open() {
            return Err(RepoError::invalid(format!("session {id} is already closed")));
        }
        session.ended_at = Some(end.ended_at);
        session.end_reason = Some(end.reason);
        session.final_meters = end.final_meters;
        session.final_day = end.final_day;
        let row = session.clone();
        self.pending.sessions.insert(id);
        Ok(row)
    }

    fn get_session(&self, id: SessionId) -> Result<GameSession, RepoError> {
        self.sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| RepoError::not_found("session", id))
    }

    fn open_session(&self, player_id: PlayerId) -> Result<Option<GameSession>, RepoError> {
        Ok(self
            .sessions
            .values()
            .find(|s| s.player_id == player_id && s.is_open())
            .cloned())
    }

    fn create_supplier_order(
        &mut self,
        order: NewSupplierOrder,
    ) -> Result<SupplierOrder, RepoError> {
        require_valid_id(order.item_id.is_valid(), "item id")?;
        if order.quantity == 0 {
            return Err(RepoError::invalid("order quantity must be positive"));
        }
        let row = SupplierOrder {
            id: SupplierOrderId::new(next_id(&mut self.watermarks.supplier_order)),
            item_id: order.item_id,
            quantity: order.quantity,
            cost: order.cost,
            ordered_at: order.ordered_at,
            status: order.status,
        };
        self.supplier_orders.push(row.clone());
        self.pending.supplier_orders.push(row.clone());
        Ok(row)
    }
}
