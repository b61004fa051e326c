//! `SQLite` data layer for the Supermart store simulation.
//!
//! The store controller runs against an in-memory repository. This crate
//! seeds that repository from `SQLite` at startup and flushes its write
//! journal back at the end of each engine tick.
//!
//! # Architecture
//!
//! ```text
//! Startup
//!     +-- load_hydration() -----> MemoryRepository::hydrated
//!
//! Engine tick
//!     +-- take_journal() -------> persist_journal() (one transaction)
//!         |-- InventoryStore   (items, customers, players)
//!         |-- LedgerStore      (transactions, supplier orders)
//!         |-- DecisionStore    (decision logs)
//!         +-- SessionStore     (game sessions)
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool and configuration
//! - [`inventory_store`] -- Items, customers, and players
//! - [`ledger_store`] -- Purchases and supplier orders
//! - [`decision_store`] -- Decision history
//! - [`session_store`] -- Game sessions
//! - [`journal_persist`] -- Journal flush
//! - [`hydrate`] -- Startup load
//! - [`error`] -- Shared error types

pub mod decision_store;
pub mod error;
pub mod hydrate;
pub mod inventory_store;
pub mod journal_persist;
pub mod ledger_store;
pub mod session_store;
pub mod sqlite;

pub use decision_store::{DecisionLogRow, DecisionStore};
pub use error::DbError;
pub use hydrate::{load_hydration, load_watermarks};
pub use inventory_store::{CustomerRow, InventoryStore, ItemRow, PlayerRow};
pub use journal_persist::{PersistError, persist_journal};
pub use ledger_store::{LedgerStore, SupplierOrderRow, TransactionRow};
pub use session_store::{SessionRow, SessionStore};
pub use sqlite::{SqliteConfig, StorePool};
