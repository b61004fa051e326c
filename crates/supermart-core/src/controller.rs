//! The store controller: one logical actor that owns the clock, the
//! scheduler, the economy, the decision desk, and the repository.
//!
//! Every mutation of the meters happens inside a `&mut self` method, so a
//! clamp-then-check sequence can never interleave with another mutator.
//! Time only moves through [`Store::tick`], which fires due tasks in
//! deadline order and moves the clock to each deadline first.
//!
//! Repository calls made after a meter change are best-effort: a failure is
//! logged, recorded as [`StoreEvent::PersistenceFailed`], and never rolls
//! the meters back.
//!
//! # Session lifecycle
//!
//! ```text
//! start_session ─► live ──(meter hits 0)──► GameOver event ─► end_session
//!                   │  ▲
//!                   ▼  │ tick: EndOfDay / NextCrisis / CustomerArrival /
//!                      │       DecisionTimeout
//! ```

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use supermart_types::{
    ChoiceSide, CustomerId, Decision, FIRST_DAY, GameOverReason, GameSession, ItemId, MeterDelta,
    MeterState, OrderStatus, PlayerId, PresentationId, Resolution, SessionId, SupplierOrder,
    Transaction,
};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, GameClock, GameInstant};
use crate::config::{ConfigError, CustomerConfig, StoreConfig};
use crate::decision::{
    DecisionCatalog, DecisionDesk, Presentation, ResolvedDecision, RestockPolicy,
    restock_decisions,
};
use crate::economy::{DepletionRange, Economy};
use crate::error::StoreError;
use crate::repository::{
    NewDecisionLog, NewSupplierOrder, NewTransaction, RepoError, Repository, SessionEnd,
};
use crate::scheduler::{Scheduler, StoreTask, TaskHandle};

/// Gameplay rules resolved from [`StoreConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRules {
    /// Game time per day.
    pub day_duration: Duration,
    /// Game time between crises.
    pub crisis_interval: Duration,
    /// Game time between walk-in customers.
    pub customer_interval: Duration,
    /// Game time a decision stays open.
    pub decision_timeout: Duration,
    /// Daily stock depletion.
    pub depletion: DepletionRange,
    /// Satisfaction gained per purchase.
    pub purchase_bonus: i32,
    /// Low-stock policy.
    pub restock: RestockPolicy,
    /// Walk-in generation.
    pub customers: CustomerConfig,
}

impl StoreRules {
    /// Resolve the rules from a config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the config fails validation.
    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            day_duration: config.game.day_duration(),
            crisis_interval: config.game.crisis_interval(),
            customer_interval: config.game.customer_interval(),
            decision_timeout: config.game.decision_timeout(),
            depletion: DepletionRange::from_config(&config.economy)?,
            purchase_bonus: config.economy.purchase_satisfaction_bonus,
            restock: RestockPolicy::from(&config.restock),
            customers: config.customers.clone(),
        })
    }
}

/// Something the presentation layer may want to render or log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A session opened.
    SessionStarted {
        /// The new session.
        session_id: SessionId,
        /// Who is playing.
        player_id: PlayerId,
    },
    /// Meter values changed.
    MetersChanged {
        /// The new state.
        state: MeterState,
    },
    /// A new day began.
    DayAdvanced {
        /// The new day number.
        day: u32,
        /// Stock removed overnight.
        depletion: i32,
    },
    /// A decision went on screen.
    DecisionPresented {
        /// Presentation id to answer with.
        id: PresentationId,
        /// The decision shown.
        decision: Decision,
        /// When it times out.
        deadline: GameInstant,
    },
    /// A decision reached its terminal state.
    DecisionResolved {
        /// Presentation id.
        id: PresentationId,
        /// How it resolved.
        resolution: Resolution,
        /// Deltas applied.
        delta: MeterDelta,
    },
    /// A purchase went through.
    PurchaseRecorded {
        /// The appended transaction.
        transaction: Transaction,
    },
    /// A purchase was refused.
    PurchaseRejected {
        /// Requested item.
        item_id: ItemId,
        /// Requested units.
        quantity: u32,
        /// Why it was refused.
        reason: String,
    },
    /// An item was restocked through a supplier order.
    Restocked {
        /// The order placed.
        order: SupplierOrder,
    },
    /// A repository write failed; gameplay state was kept.
    PersistenceFailed {
        /// The repository operation.
        operation: &'static str,
        /// The failure.
        message: String,
    },
    /// A meter reached zero.
    GameOver {
        /// Why.
        reason: GameOverReason,
        /// The frozen state.
        state: MeterState,
    },
}

#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    id: SessionId,
    player_id: PlayerId,
    closed: bool,
}

/// The Event/Session controller.
#[derive(Debug)]
pub struct Store<R, G> {
    rules: StoreRules,
    clock: GameClock,
    scheduler: Scheduler<StoreTask>,
    economy: Economy,
    desk: DecisionDesk,
    catalog: DecisionCatalog,
    repo: R,
    rng: G,
    session: Option<ActiveSession>,
    day_task: Option<TaskHandle>,
    events: Vec<StoreEvent>,
}

impl<R: Repository, G: Rng> Store<R, G> {
    /// Build a store using the crisis catalog named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the config fails validation.
    pub fn new(config: &StoreConfig, repo: R, rng: G) -> Result<Self, ConfigError> {
        let catalog = DecisionCatalog::builtin(config.crises.catalog);
        Self::with_catalog(config, catalog, repo, rng)
    }

    /// Build a store with an explicit crisis catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the config fails validation.
    pub fn with_catalog(
        config: &StoreConfig,
        catalog: DecisionCatalog,
        repo: R,
        rng: G,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: StoreRules::from_config(config)?,
            clock: GameClock::new(),
            scheduler: Scheduler::new(),
            economy: Economy::new(),
            desk: DecisionDesk::new(),
            catalog,
            repo,
            rng,
            session: None,
            day_task: None,
            events: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Open a session for `player_id` at the starting meter state and
    /// schedule the day, crisis, and customer timers.
    ///
    /// # Errors
    ///
    /// [`StoreError::SessionAlreadyOpen`] if a session is open,
    /// [`StoreError::InvalidArgument`] / [`StoreError::NotFound`] for a bad
    /// player, [`StoreError::Storage`] if the session row cannot be written.
    pub fn start_session(&mut self, player_id: PlayerId) -> Result<GameSession, StoreError> {
        if !player_id.is_valid() {
            return Err(StoreError::invalid("player id must be positive"));
        }
        if self.session.is_some_and(|s| !s.closed) || self.repo.open_session(player_id)?.is_some()
        {
            return Err(StoreError::SessionAlreadyOpen);
        }
        self.repo.get_player(player_id)?;
        let session = self.repo.start_session(player_id, Utc::now())?;

        self.expire_leftover_decisions();
        self.economy = Economy::new();
        self.clock.reset();
        self.scheduler.clear();
        self.desk.clear();
        self.session = Some(ActiveSession {
            id: session.id,
            player_id,
            closed: false,
        });

        let now = self.clock.now();
        self.day_task = Some(self.scheduler.schedule_after(
            now,
            self.rules.day_duration,
            StoreTask::EndOfDay,
        )?);
        self.scheduler
            .schedule_after(now, self.rules.crisis_interval, StoreTask::NextCrisis)?;
        self.scheduler
            .schedule_after(now, self.rules.customer_interval, StoreTask::CustomerArrival)?;

        if let Err(err) = self.repo.update_player_days(player_id, FIRST_DAY) {
            self.report_persistence("update_player_days", &err);
        }

        info!(session_id = %session.id, %player_id, "Session started");
        self.events.push(StoreEvent::SessionStarted {
            session_id: session.id,
            player_id,
        });
        self.events.push(StoreEvent::MetersChanged {
            state: self.economy.state(),
        });
        Ok(session)
    }

    /// Time out whatever the last game left on screen so each presentation
    /// is logged against the frozen meters before the desk is reset.
    fn expire_leftover_decisions(&mut self) {
        let leftover: Vec<PresentationId> = self.desk.pending().map(|p| p.id).collect();
        for id in leftover {
            match self.desk.expire(id) {
                Ok(resolved) => {
                    self.apply_resolution(&resolved);
                }
                Err(err) => debug!(%id, %err, "Leftover decision already resolved"),
            }
        }
    }

    /// Close the current session with the final meters and `reason`.
    ///
    /// Idempotent: returns `false` if there is no open session. Repeating
    /// timers are cancelled; pending decision timeouts still fire so every
    /// presentation is logged.
    pub fn end_session(&mut self, reason: GameOverReason) -> bool {
        let Some(active) = self.session.as_mut() else {
            return false;
        };
        if active.closed {
            return false;
        }
        active.closed = true;
        let session_id = active.id;

        self.scheduler
            .retain(|task| matches!(task, StoreTask::DecisionTimeout(_)));
        self.day_task = None;

        let state = self.economy.state();
        let end = SessionEnd {
            reason,
            final_meters: state.snapshot(),
            final_day: state.day,
            ended_at: Utc::now(),
        };
        if let Err(err) = self.repo.end_session(session_id, end) {
            self.report_persistence("end_session", &err);
        }
        info!(%session_id, %reason, day = state.day, "Session ended");
        true
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance game time by `elapsed`, firing every task that falls due.
    ///
    /// # Errors
    ///
    /// [`StoreError::Clock`] if the clock would overflow.
    pub fn tick(&mut self, elapsed: Duration) -> Result<MeterState, StoreError> {
        let target = self
            .clock
            .now()
            .checked_add(elapsed)
            .ok_or(ClockError::Overflow)?;
        while let Some((deadline, task)) = self.scheduler.pop_due(target) {
            if deadline > self.clock.now() {
                self.clock.advance_to(deadline)?;
            }
            self.run_task(task);
        }
        self.clock.advance_to(target)?;
        Ok(self.economy.state())
    }

    fn run_task(&mut self, task: StoreTask) {
        match task {
            StoreTask::EndOfDay => {
                self.advance_day();
            }
            StoreTask::NextCrisis => {
                if self.economy.is_game_over() {
                    return;
                }
                if let Err(err) = self.present_random_crisis() {
                    warn!(%err, "Crisis could not be presented");
                }
                self.reschedule(self.rules.crisis_interval, StoreTask::NextCrisis);
            }
            StoreTask::CustomerArrival => {
                if self.economy.is_game_over() {
                    return;
                }
                if let Err(err) = self.serve_walk_in() {
                    debug!(%err, "Walk-in customer left without buying");
                }
                self.reschedule(self.rules.customer_interval, StoreTask::CustomerArrival);
            }
            StoreTask::DecisionTimeout(id) => match self.desk.expire(id) {
                Ok(resolved) => {
                    self.apply_resolution(&resolved);
                }
                Err(err) => debug!(%id, %err, "Stale decision timeout ignored"),
            },
        }
    }

    fn reschedule(&mut self, delay: Duration, task: StoreTask) -> Option<TaskHandle> {
        match self.scheduler.schedule_after(self.clock.now(), delay, task) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(?task, %err, "Task could not be rescheduled");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Economy
    // -----------------------------------------------------------------------

    fn apply(&mut self, delta: MeterDelta) -> MeterState {
        let was_over = self.economy.is_game_over();
        let update = self.economy.apply_delta(delta);
        if !was_over && !delta.is_zero() {
            self.events.push(StoreEvent::MetersChanged {
                state: update.state,
            });
        }
        if let Some(reason) = update.game_over {
            self.on_game_over(reason);
        }
        update.state
    }

    fn on_game_over(&mut self, reason: GameOverReason) {
        let state = self.economy.state();
        warn!(
            %reason,
            day = state.day,
            stock = state.stock,
            satisfaction = state.satisfaction,
            profit = state.profit,
            morale = state.morale,
            "Game over"
        );
        self.events.push(StoreEvent::GameOver { reason, state });
        self.end_session(reason);
    }

    /// Apply a raw delta to the meters through the economy.
    ///
    /// A no-op once the game is over.
    pub fn apply_delta(&mut self, delta: MeterDelta) -> MeterState {
        self.apply(delta)
    }

    /// Start the next day: deplete stock, reset the day timer, update the
    /// player record, and present restock prompts for low items in id
    /// order. A no-op once the game is over.
    pub fn advance_day(&mut self) -> MeterState {
        let Some(advance) = self
            .economy
            .advance_day(&mut self.rng, self.rules.depletion)
        else {
            return self.economy.state();
        };
        let state = advance.update.state;
        info!(day = state.day, depletion = advance.depletion, stock = state.stock, "Day advanced");
        self.events.push(StoreEvent::DayAdvanced {
            day: state.day,
            depletion: advance.depletion,
        });
        self.events.push(StoreEvent::MetersChanged { state });

        if let Some(reason) = advance.update.game_over {
            self.on_game_over(reason);
            return state;
        }

        if let Some(handle) = self.day_task.take() {
            self.scheduler.cancel(handle);
        }
        if self.has_open_session() {
            self.day_task = self.reschedule(self.rules.day_duration, StoreTask::EndOfDay);
        }

        if let Some(player_id) = self.session.map(|s| s.player_id)
            && let Err(err) = self.repo.update_player_days(player_id, state.day)
        {
            self.report_persistence("update_player_days", &err);
        }

        match self.repo.list_low_stock(self.rules.restock.threshold) {
            Ok(items) => {
                for decision in restock_decisions(&items, &self.rules.restock) {
                    if let Err(err) = self.present_decision(decision) {
                        warn!(%err, "Restock prompt could not be presented");
                    }
                }
            }
            Err(err) => self.report_persistence("list_low_stock", &err),
        }
        state
    }

    // -----------------------------------------------------------------------
    // Decisions
    // -----------------------------------------------------------------------

    /// Present `decision` with the configured timeout.
    ///
    /// # Errors
    ///
    /// [`StoreError::GameOver`] once the game has ended.
    pub fn present_decision(&mut self, decision: Decision) -> Result<PresentationId, StoreError> {
        let timeout = self.rules.decision_timeout;
        self.present_decision_with_timeout(decision, timeout)
    }

    /// Present `decision`; if unanswered after `timeout` of game time the
    /// right branch is applied.
    ///
    /// # Errors
    ///
    /// [`StoreError::GameOver`] once the game has ended,
    /// [`StoreError::Clock`] if the deadline overflows.
    pub fn present_decision_with_timeout(
        &mut self,
        decision: Decision,
        timeout: Duration,
    ) -> Result<PresentationId, StoreError> {
        if self.economy.is_game_over() {
            return Err(StoreError::GameOver);
        }
        let now = self.clock.now();
        let id = self
            .desk
            .present(decision.clone(), now, timeout, &mut self.scheduler)?;
        let deadline = self.desk.get(id).map_or(now, |p| p.deadline);
        info!(%id, description = %decision.description, %deadline, "Decision presented");
        self.events.push(StoreEvent::DecisionPresented {
            id,
            decision,
            deadline,
        });
        Ok(id)
    }

    /// Present a crisis drawn uniformly from the catalog.
    ///
    /// # Errors
    ///
    /// Same as [`Store::present_decision`].
    pub fn present_random_crisis(&mut self) -> Result<PresentationId, StoreError> {
        let decision = self.catalog.pick(&mut self.rng).clone();
        self.present_decision(decision)
    }

    /// Answer a presented decision.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyResolved`] if it already resolved (by choice or
    /// timeout), [`StoreError::NotFound`] for an unknown id.
    pub fn resolve_decision(
        &mut self,
        id: PresentationId,
        side: ChoiceSide,
    ) -> Result<MeterState, StoreError> {
        let resolved = match self.desk.resolve(id, side, &mut self.scheduler) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(%id, %side, %err, "Decision resolution rejected");
                return Err(err.into());
            }
        };
        Ok(self.apply_resolution(&resolved))
    }

    fn apply_resolution(&mut self, resolved: &ResolvedDecision) -> MeterState {
        let delta = resolved.delta();
        let was_over = self.economy.is_game_over();
        let state = self.apply(delta);

        if resolved.resolution.timed_out() {
            info!(
                id = %resolved.id,
                description = %resolved.decision.description,
                "Decision timed out"
            );
        } else {
            info!(
                id = %resolved.id,
                side = %resolved.resolution.side(),
                description = %resolved.decision.description,
                "Decision resolved"
            );
        }
        self.events.push(StoreEvent::DecisionResolved {
            id: resolved.id,
            resolution: resolved.resolution,
            delta,
        });

        if !was_over
            && let Some(item_id) = resolved.decision.item_id
            && let Ok(quantity) = u32::try_from(delta.stock)
            && quantity > 0
        {
            self.restock_item(item_id, quantity);
        }

        match self.session {
            Some(active) => {
                let log = NewDecisionLog {
                    player_id: active.player_id,
                    description: resolved.decision.description.clone(),
                    resolution: resolved.resolution,
                    item_id: resolved.decision.item_id,
                    delta,
                    day: state.day,
                    decided_at: Utc::now(),
                };
                if let Err(err) = self.repo.record_decision(log) {
                    self.report_persistence("record_decision", &err);
                }
            }
            None => warn!(id = %resolved.id, "Decision resolved outside a session; not logged"),
        }
        state
    }

    // -----------------------------------------------------------------------
    // Restocking
    // -----------------------------------------------------------------------

    fn restock_item(&mut self, item_id: ItemId, quantity: u32) -> Option<SupplierOrder> {
        let delta = i32::try_from(quantity).unwrap_or(i32::MAX);
        let item = match self.repo.update_item_stock(item_id, delta) {
            Ok(item) => item,
            Err(err) => {
                self.report_persistence("update_item_stock", &err);
                return None;
            }
        };
        let order = NewSupplierOrder {
            item_id,
            quantity,
            cost: item.unit_price.saturating_mul(Decimal::from(quantity)),
            ordered_at: Utc::now(),
            status: OrderStatus::Pending,
        };
        match self.repo.create_supplier_order(order) {
            Ok(order) => {
                info!(
                    %item_id,
                    item = %item.name,
                    quantity,
                    cost = %order.cost,
                    stock_level = item.stock_level,
                    "Item restocked"
                );
                self.events.push(StoreEvent::Restocked {
                    order: order.clone(),
                });
                Some(order)
            }
            Err(err) => {
                self.report_persistence("create_supplier_order", &err);
                None
            }
        }
    }

    /// Restock every low item right away, in id order.
    ///
    /// Each restock adds the policy quantity to the item, places a supplier
    /// order, and applies the policy delta to the meters. An item whose
    /// restock could not be written leaves the meters alone. Stops early if
    /// a restock ends the game.
    ///
    /// # Errors
    ///
    /// [`StoreError::GameOver`] once the game has ended,
    /// [`StoreError::Storage`] if low items cannot be listed.
    pub fn report_low_stock(&mut self) -> Result<Vec<SupplierOrder>, StoreError> {
        if self.economy.is_game_over() {
            return Err(StoreError::GameOver);
        }
        let policy = self.rules.restock;
        let low = self.repo.list_low_stock(policy.threshold)?;
        let mut orders = Vec::with_capacity(low.len());
        for item in low {
            let Some(order) = self.restock_item(item.id, policy.quantity) else {
                continue;
            };
            orders.push(order);
            if self.apply(policy.delta()).game_over {
                break;
            }
        }
        info!(orders = orders.len(), "Low stock reported");
        Ok(orders)
    }

    // -----------------------------------------------------------------------
    // Purchases
    // -----------------------------------------------------------------------

    /// Sell `quantity` units of `item_id` to `customer_id`.
    ///
    /// On success the transaction is appended, the item's stock and sales
    /// count move, and the meters change by (-quantity stock, +bonus
    /// satisfaction, +rounded total profit). Failures mutate nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError::GameOver`], [`StoreError::InvalidArgument`],
    /// [`StoreError::NotFound`], [`StoreError::InsufficientStock`], or
    /// [`StoreError::Storage`] if the transaction cannot be written.
    pub fn record_purchase(
        &mut self,
        customer_id: CustomerId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<Transaction, StoreError> {
        let result = self.try_purchase(customer_id, item_id, quantity);
        if let Err(err) = &result {
            warn!(%customer_id, %item_id, quantity, %err, "Purchase rejected");
            self.events.push(StoreEvent::PurchaseRejected {
                item_id,
                quantity,
                reason: err.to_string(),
            });
        }
        result
    }

    fn try_purchase(
        &mut self,
        customer_id: CustomerId,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<Transaction, StoreError> {
        if self.economy.is_game_over() {
            return Err(StoreError::GameOver);
        }
        if !customer_id.is_valid() {
            return Err(StoreError::invalid("customer id must be positive"));
        }
        if !item_id.is_valid() {
            return Err(StoreError::invalid("item id must be positive"));
        }
        if quantity == 0 {
            return Err(StoreError::invalid("quantity must be positive"));
        }

        let item = self.repo.get_item(item_id)?;
        self.repo.get_customer(customer_id)?;
        if item.stock_level < quantity {
            return Err(StoreError::InsufficientStock {
                item_id,
                available: item.stock_level,
                requested: quantity,
            });
        }

        let total_cost = item.unit_price.saturating_mul(Decimal::from(quantity));
        let bonus = self.rules.purchase_bonus;
        let transaction = self.repo.record_transaction(NewTransaction {
            customer_id,
            item_id,
            quantity,
            total_cost,
            purchased_at: Utc::now(),
            satisfaction_change: bonus,
        })?;
        if let Err(err) = self.repo.record_sale(item_id, quantity) {
            self.report_persistence("record_sale", &err);
        }

        let units = i32::try_from(quantity).unwrap_or(i32::MAX);
        let profit = total_cost.round().to_i32().unwrap_or(i32::MAX);
        info!(
            %customer_id,
            %item_id,
            item = %item.name,
            quantity,
            total_cost = %total_cost,
            "Purchase recorded"
        );
        self.events.push(StoreEvent::PurchaseRecorded {
            transaction: transaction.clone(),
        });
        self.apply(MeterDelta::new(units.saturating_neg(), bonus, profit, 0));
        Ok(transaction)
    }

    /// Serve one walk-in customer: a random item and quantity, then a new
    /// customer with a random name and loyalty balance, then the purchase.
    ///
    /// Returns `Ok(None)` without creating a customer when the shelf is
    /// short or the store has no items.
    ///
    /// # Errors
    ///
    /// [`StoreError::GameOver`] once the game has ended, or any error from
    /// the repository or [`Store::record_purchase`].
    pub fn serve_walk_in(&mut self) -> Result<Option<Transaction>, StoreError> {
        if self.economy.is_game_over() {
            return Err(StoreError::GameOver);
        }
        let items = self.repo.list_items()?;
        let Some(item) = items.choose(&mut self.rng) else {
            debug!("No items on sale; walk-in skipped");
            return Ok(None);
        };
        let quantity = self.rng.random_range(1..=self.rules.customers.max_quantity);
        if item.stock_level < quantity {
            debug!(
                item_id = %item.id,
                stock_level = item.stock_level,
                quantity,
                "Shelf short; walk-in skipped"
            );
            return Ok(None);
        }

        let customers = &self.rules.customers;
        let name = customers
            .names
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| "Walk-in".to_owned());
        let loyalty = self
            .rng
            .random_range(customers.loyalty_min..customers.loyalty_max);
        let customer_id = self.repo.create_customer(&name, loyalty)?;
        debug!(%customer_id, %name, loyalty, "Customer arrived");
        self.record_purchase(customer_id, item.id, quantity).map(Some)
    }

    // -----------------------------------------------------------------------
    // Diagnostics and accessors
    // -----------------------------------------------------------------------

    fn report_persistence(&mut self, operation: &'static str, err: &RepoError) {
        warn!(operation, %err, "Persistence failed; gameplay state kept");
        self.events.push(StoreEvent::PersistenceFailed {
            operation,
            message: err.to_string(),
        });
    }

    /// Current meters.
    pub const fn state(&self) -> MeterState {
        self.economy.state()
    }

    /// Whether the game has ended.
    pub const fn is_game_over(&self) -> bool {
        self.economy.is_game_over()
    }

    /// Current game time.
    pub const fn now(&self) -> GameInstant {
        self.clock.now()
    }

    /// The earliest pending task deadline.
    pub fn next_deadline(&mut self) -> Option<GameInstant> {
        self.scheduler.next_deadline()
    }

    /// Decisions still awaiting an answer, oldest first.
    pub fn pending_decisions(&self) -> Vec<&Presentation> {
        self.desk.pending().collect()
    }

    /// Look up a presentation.
    pub fn presentation(&self, id: PresentationId) -> Option<&Presentation> {
        self.desk.get(id)
    }

    /// Take every event produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// The current (possibly closed) session id.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.map(|s| s.id)
    }

    /// Whether a session is open.
    pub fn has_open_session(&self) -> bool {
        self.session.is_some_and(|s| !s.closed)
    }

    /// The repository.
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// The repository, mutably (used to drain the write journal).
    pub const fn repository_mut(&mut self) -> &mut R {
        &mut self.repo
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::memory::MemoryRepository;

    fn store() -> (Store<MemoryRepository, StdRng>, PlayerId) {
        let mut repo = MemoryRepository::new();
        let player = repo.create_player("You").unwrap();
        let store = Store::new(&StoreConfig::default(), repo, StdRng::seed_from_u64(1)).unwrap();
        (store, player.id)
    }

    #[test]
    fn start_schedules_three_timers() {
        let (mut store, player) = store();
        store.start_session(player).unwrap();
        assert_eq!(store.next_deadline(), Some(GameInstant::from_millis(5_000)));
        assert!(store.has_open_session());
        let events = store.drain_events();
        assert!(matches!(events.first(), Some(StoreEvent::SessionStarted { .. })));
    }

    #[test]
    fn unknown_player_cannot_start() {
        let (mut store, _) = store();
        assert!(matches!(
            store.start_session(PlayerId::new(99)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.start_session(PlayerId::new(0)),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn crisis_fires_on_interval() {
        let (mut store, player) = store();
        store.start_session(player).unwrap();
        store.tick(Duration::from_secs(30)).unwrap();
        assert_eq!(store.pending_decisions().len(), 1);
        assert_eq!(store.now(), GameInstant::from_millis(30_000));
    }

    #[test]
    fn day_ends_after_duration() {
        let (mut store, player) = store();
        store.start_session(player).unwrap();
        store.tick(Duration::from_secs(60)).unwrap();
        assert!(store.state().day == 2 || store.is_game_over());
        let days = store.repository().get_player(player).unwrap().days_survived;
        assert_eq!(days, store.state().day);
    }

    #[test]
    fn purchase_on_missing_item_is_not_found() {
        let (mut store, player) = store();
        store.start_session(player).unwrap();
        let customer = store.repository_mut().create_customer("Mia Harris", 20).unwrap();
        let before = store.state();
        assert!(matches!(
            store.record_purchase(customer, ItemId::new(7), 1),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(store.state(), before);
        assert!(
            store
                .drain_events()
                .iter()
                .any(|e| matches!(e, StoreEvent::PurchaseRejected { .. }))
        );
    }
}
