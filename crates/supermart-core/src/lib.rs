//! Meter economy, decisions, scheduling, and session control for the
//! Supermart store simulation.
//!
//! Everything in this crate is synchronous and free of I/O. Time is a
//! monotonic game clock moved by the caller, randomness is injected, and
//! storage sits behind the [`Repository`] trait.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic game clock in milliseconds since session start.
//! - [`config`] -- Configuration loading from `supermart-config.yaml`.
//! - [`controller`] -- The [`Store`] controller and its [`StoreEvent`]s.
//! - [`decision`] -- Crisis catalogs, restock prompts, and the decision desk.
//! - [`economy`] -- Bounded meters, day advance, and game-over detection.
//! - [`error`] -- The controller error taxonomy.
//! - [`memory`] -- In-memory repository with a write journal.
//! - [`repository`] -- The storage boundary.
//! - [`scheduler`] -- Deadline-ordered task queue.
//!
//! [`Repository`]: repository::Repository
//! [`Store`]: controller::Store
//! [`StoreEvent`]: controller::StoreEvent

pub mod clock;
pub mod config;
pub mod controller;
pub mod decision;
pub mod economy;
pub mod error;
pub mod memory;
pub mod repository;
pub mod scheduler;

pub use controller::{Store, StoreEvent, StoreRules};
pub use error::StoreError;
pub use memory::{Hydration, IdWatermarks, Journal, MemoryRepository};
pub use repository::{RepoError, Repository};
