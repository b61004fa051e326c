//! Core entity and value structs for the store simulation.
//!
//! Meter values, decision templates, and the rows owned by the repository:
//! items, customers, transactions, decision log entries, game sessions,
//! supplier orders, and players.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{GameOverReason, OrderStatus, Resolution};
use crate::ids::{
    CustomerId, DecisionLogId, ItemId, PlayerId, SessionId, SupplierOrderId, TransactionId,
};

/// Lower bound of every meter.
pub const METER_MIN: i32 = 0;

/// Upper bound of every meter.
pub const METER_MAX: i32 = 100;

/// Value every meter starts a session at.
pub const METER_START: i32 = 50;

/// Day number a session starts on.
pub const FIRST_DAY: u32 = 1;

// ---------------------------------------------------------------------------
// Meters
// ---------------------------------------------------------------------------

/// The complete gameplay state: four bounded meters, the day counter, and
/// the game-over latch.
///
/// `stock`, `satisfaction`, `profit`, and `morale` always lie in
/// [`METER_MIN`]..=[`METER_MAX`]. Once `game_over` is set it never clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterState {
    /// Aggregate shelf stock.
    pub stock: i32,
    /// Customer satisfaction.
    pub satisfaction: i32,
    /// Profit.
    pub profit: i32,
    /// Staff morale.
    pub morale: i32,
    /// Current day, starting at [`FIRST_DAY`].
    pub day: u32,
    /// Whether the game has ended.
    pub game_over: bool,
    /// The reason recorded when the game ended.
    pub game_over_reason: Option<GameOverReason>,
}

impl MeterState {
    /// The fixed starting state of every session (50/50/50/50, day 1).
    pub const fn initial() -> Self {
        Self {
            stock: METER_START,
            satisfaction: METER_START,
            profit: METER_START,
            morale: METER_START,
            day: FIRST_DAY,
            game_over: false,
            game_over_reason: None,
        }
    }

    /// The four meter values without the day counter or game-over latch.
    pub const fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            stock: self.stock,
            satisfaction: self.satisfaction,
            profit: self.profit,
            morale: self.morale,
        }
    }
}

impl Default for MeterState {
    fn default() -> Self {
        Self::initial()
    }
}

/// The four meter values as stored with a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterSnapshot {
    /// Stock meter.
    pub stock: i32,
    /// Satisfaction meter.
    pub satisfaction: i32,
    /// Profit meter.
    pub profit: i32,
    /// Morale meter.
    pub morale: i32,
}

impl Default for MeterSnapshot {
    fn default() -> Self {
        MeterState::initial().snapshot()
    }
}

/// Signed change to each of the four meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeterDelta {
    /// Change to stock.
    pub stock: i32,
    /// Change to satisfaction.
    pub satisfaction: i32,
    /// Change to profit.
    pub profit: i32,
    /// Change to morale.
    pub morale: i32,
}

impl MeterDelta {
    /// The delta that changes nothing.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Build a delta from its four components.
    pub const fn new(stock: i32, satisfaction: i32, profit: i32, morale: i32) -> Self {
        Self {
            stock,
            satisfaction,
            profit,
            morale,
        }
    }

    /// A delta touching only the stock meter.
    pub const fn stock_only(stock: i32) -> Self {
        Self::new(stock, 0, 0, 0)
    }

    /// Whether every component is zero.
    pub const fn is_zero(&self) -> bool {
        self.stock == 0 && self.satisfaction == 0 && self.profit == 0 && self.morale == 0
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// One branch of a decision: a display label and the meter deltas it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Text shown on the button.
    pub label: String,
    /// Meter change applied when this branch is taken.
    pub delta: MeterDelta,
}

impl Choice {
    /// Build a choice from a label and delta.
    pub fn new(label: &str, delta: MeterDelta) -> Self {
        Self {
            label: label.to_owned(),
            delta,
        }
    }
}

/// A binary-choice event template.
///
/// Decisions are plain values drawn from a catalog (or synthesized for
/// low-stock items). They become persisted only as a [`DecisionLog`] once
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The prompt shown to the player.
    pub description: String,
    /// The accept/act branch.
    pub left: Choice,
    /// The deny/default branch, also applied on timeout.
    pub right: Choice,
    /// The item this decision restocks, if any.
    pub item_id: Option<ItemId>,
}

impl Decision {
    /// The branch for the given side.
    pub const fn choice(&self, side: crate::enums::ChoiceSide) -> &Choice {
        match side {
            crate::enums::ChoiceSide::Left => &self.left,
            crate::enums::ChoiceSide::Right => &self.right,
        }
    }
}

// ---------------------------------------------------------------------------
// Repository rows
// ---------------------------------------------------------------------------

/// Where an item sits on the shop floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfPosition {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Row identifier.
    pub id: ItemId,
    /// Product name.
    pub name: String,
    /// Units on the shelf (never negative).
    pub stock_level: u32,
    /// Units sold so far.
    pub sales_count: u32,
    /// Price per unit (strictly positive).
    pub unit_price: Decimal,
    /// Shelf location.
    pub shelf: ShelfPosition,
}

/// A customer, created when they make a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Row identifier.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Loyalty points at creation time.
    pub loyalty_points: u32,
}

/// An append-only purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Row identifier.
    pub id: TransactionId,
    /// Who bought.
    pub customer_id: CustomerId,
    /// What was bought.
    pub item_id: ItemId,
    /// How many units (strictly positive).
    pub quantity: u32,
    /// `quantity * unit_price` at purchase time.
    pub total_cost: Decimal,
    /// When the purchase happened.
    pub purchased_at: DateTime<Utc>,
    /// Satisfaction change credited for the purchase.
    pub satisfaction_change: i32,
}

/// An append-only record of a resolved decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLog {
    /// Row identifier.
    pub id: DecisionLogId,
    /// The player the decision was presented to.
    pub player_id: PlayerId,
    /// The decision prompt.
    pub description: String,
    /// Which side was applied and whether it was a timeout.
    pub resolution: Resolution,
    /// The item the decision concerned, if any.
    pub item_id: Option<ItemId>,
    /// The deltas of the applied branch.
    pub delta: MeterDelta,
    /// Game day on which the decision resolved.
    pub day: u32,
    /// Wall-clock time of resolution.
    pub decided_at: DateTime<Utc>,
}

/// One played game, bounded by start and game over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    /// Session identifier.
    pub id: SessionId,
    /// The player playing this session.
    pub player_id: PlayerId,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session ended; `None` while open.
    pub ended_at: Option<DateTime<Utc>>,
    /// Why the session ended; `None` while open.
    pub end_reason: Option<GameOverReason>,
    /// Meter values at start, overwritten with the final values at end.
    pub final_meters: MeterSnapshot,
    /// Last day reached.
    pub final_day: u32,
}

impl GameSession {
    /// Whether the session has not been closed yet.
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Rebuild the meter state recorded with this session.
    pub const fn final_state(&self) -> MeterState {
        MeterState {
            stock: self.final_meters.stock,
            satisfaction: self.final_meters.satisfaction,
            profit: self.final_meters.profit,
            morale: self.final_meters.morale,
            day: self.final_day,
            game_over: self.end_reason.is_some(),
            game_over_reason: self.end_reason,
        }
    }
}

/// A restock order placed with the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierOrder {
    /// Row identifier.
    pub id: SupplierOrderId,
    /// The item being restocked.
    pub item_id: ItemId,
    /// Units ordered (strictly positive).
    pub quantity: u32,
    /// `quantity * unit_price`.
    pub cost: Decimal,
    /// When the order was placed.
    pub ordered_at: DateTime<Utc>,
    /// Order status.
    pub status: OrderStatus,
}

/// A player profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Row identifier.
    pub id: PlayerId,
    /// Display name.
    pub username: String,
    /// Highest day reached in the latest session.
    pub days_survived: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::ChoiceSide;

    #[test]
    fn initial_state_is_fifty_across_day_one() {
        let state = MeterState::default();
        assert_eq!(state.snapshot(), MeterSnapshot {
            stock: 50,
            satisfaction: 50,
            profit: 50,
            morale: 50,
        });
        assert_eq!(state.day, 1);
        assert!(!state.game_over);
        assert!(state.game_over_reason.is_none());
    }

    #[test]
    fn decision_choice_by_side() {
        let decision = Decision {
            description: "Restock Milk?".to_owned(),
            left: Choice::new("Yes", MeterDelta::new(20, 0, -5, 0)),
            right: Choice::new("No", MeterDelta::ZERO),
            item_id: Some(ItemId::new(1)),
        };
        assert_eq!(decision.choice(ChoiceSide::Left).delta.stock, 20);
        assert!(decision.choice(ChoiceSide::Right).delta.is_zero());
    }

    #[test]
    fn session_final_state_round_trips_through_json() {
        let session = GameSession {
            id: SessionId::new(),
            player_id: PlayerId::new(1),
            started_at: Utc::now(),
            ended_at: Some(Utc::now()),
            end_reason: Some(GameOverReason::Boycott),
            final_meters: MeterSnapshot {
                stock: 12,
                satisfaction: 0,
                profit: 77,
                morale: 3,
            },
            final_day: 9,
        };

        let json = serde_json::to_string(&session).unwrap();
        let restored: GameSession = serde_json::from_str(&json).unwrap();
        let state = restored.final_state();

        assert_eq!(state.snapshot(), session.final_meters);
        assert_eq!(state.game_over_reason, Some(GameOverReason::Boycott));
        assert!(state.game_over);
        assert!(!restored.is_open());
    }
}
