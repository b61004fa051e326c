//! Shared type definitions for the Supermart store simulation.
//!
//! This crate is the single source of truth for the value and entity types
//! used across the workspace: the core engine, the data layer, and the
//! engine binary all speak these types.
//!
//! # Modules
//!
//! - [`ids`] -- Typed row identifiers and session/presentation IDs
//! - [`enums`] -- Game-over reasons, choice sides, resolutions, order status
//! - [`structs`] -- Meter state, decisions, and repository rows

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ChoiceSide, GameOverReason, OrderStatus, ParseEnumError, Resolution};
pub use ids::{
    CustomerId, DecisionLogId, ItemId, PlayerId, PresentationId, SessionId, SupplierOrderId,
    TransactionId,
};
pub use structs::{
    Choice, Customer, Decision, DecisionLog, FIRST_DAY, GameSession, Item, METER_MAX, METER_MIN,
    METER_START, MeterDelta, MeterSnapshot, MeterState, Player, ShelfPosition, SupplierOrder,
    Transaction,
};
