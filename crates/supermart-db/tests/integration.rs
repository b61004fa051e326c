//! Integration tests for the `supermart-db` data layer.
//!
//! Each test runs against a fresh in-memory `SQLite` database with a single
//! pooled connection, so no external services are needed.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing
)]

use chrono::Utc;
use rust_decimal::Decimal;
use supermart_core::config::StoreConfig;
use supermart_core::repository::{
    NewDecisionLog, NewSupplierOrder, NewTransaction, SessionEnd, seed_catalog,
};
use supermart_core::{MemoryRepository, Repository};
use supermart_db::{
    DecisionStore, InventoryStore, LedgerStore, PersistError, SessionStore, SqliteConfig,
    StorePool, load_hydration, persist_journal,
};
use supermart_types::{
    ChoiceSide, GameOverReason, ItemId, MeterDelta, MeterSnapshot, OrderStatus, Resolution,
};

// =============================================================================
// Helper: connect to an in-memory database and run migrations
// =============================================================================

async fn setup() -> StorePool {
    let config = SqliteConfig::new("sqlite::memory:").with_max_connections(1);
    let pool = StorePool::connect(&config)
        .await
        .expect("Failed to open in-memory SQLite");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    pool
}

fn seeded_repo() -> MemoryRepository {
    let mut repo = MemoryRepository::new();
    seed_catalog(&mut repo, &StoreConfig::default().catalog).unwrap();
    repo
}

// =============================================================================
// Schema
// =============================================================================

#[tokio::test]
async fn migrations_are_idempotent() {
    let pool = setup().await;
    pool.run_migrations()
        .await
        .expect("Re-running migrations should be a no-op");
    let hydration = load_hydration(pool.pool()).await.unwrap();
    assert!(hydration.items.is_empty());
    assert_eq!(hydration.watermarks.item, 0);
}

// =============================================================================
// Journal flush
// =============================================================================

#[tokio::test]
async fn empty_journal_writes_nothing() {
    let pool = setup().await;
    let written = persist_journal(pool.pool(), &supermart_core::Journal::default())
        .await
        .unwrap();
    assert_eq!(written, 0);
}

#[tokio::test]
async fn catalog_round_trips_through_sqlite() {
    let pool = setup().await;
    let mut repo = seeded_repo();
    let journal = repo.take_journal();
    assert_eq!(journal.items.len(), 5);

    let written = persist_journal(pool.pool(), &journal).await.unwrap();
    assert_eq!(written, 5);

    let items = InventoryStore::new(pool.pool()).load_items().await.unwrap();
    assert_eq!(items, journal.items);
    assert_eq!(items[0].name, "Milk");
    assert_eq!(items[0].unit_price, Decimal::new(25, 1));

    // A second flush of the same rows is harmless.
    persist_journal(pool.pool(), &journal).await.unwrap();
    let again = InventoryStore::new(pool.pool()).load_items().await.unwrap();
    assert_eq!(again.len(), 5);
}

#[tokio::test]
async fn full_day_of_activity_persists_and_hydrates() {
    let pool = setup().await;
    let mut repo = seeded_repo();
    let now = Utc::now();

    let player = repo.create_player("You").unwrap();
    let session = repo.start_session(player.id, now).unwrap();
    let customer = repo.create_customer("Olivia Brown", 35).unwrap();
    let tx = repo
        .record_transaction(NewTransaction {
            customer_id: customer,
            item_id: ItemId::new(1),
            quantity: 3,
            total_cost: Decimal::new(75, 1),
            purchased_at: now,
            satisfaction_change: 5,
        })
        .unwrap();
    repo.record_sale(ItemId::new(1), 3).unwrap();
    repo.record_decision(NewDecisionLog {
        player_id: player.id,
        description: "Staff demands raises!".to_owned(),
        resolution: Resolution::TimedOut,
        item_id: None,
        delta: MeterDelta::new(0, 0, 10, -15),
        day: 1,
        decided_at: now,
    })
    .unwrap();
    repo.record_decision(NewDecisionLog {
        player_id: player.id,
        description: "Restock Bread? (Cost: 5 Profit)".to_owned(),
        resolution: Resolution::Chosen(ChoiceSide::Left),
        item_id: Some(ItemId::new(2)),
        delta: MeterDelta::new(20, 0, -5, 0),
        day: 1,
        decided_at: now,
    })
    .unwrap();
    repo.update_item_stock(ItemId::new(2), 20).unwrap();
    repo.create_supplier_order(NewSupplierOrder {
        item_id: ItemId::new(2),
        quantity: 20,
        cost: Decimal::new(30, 0),
        ordered_at: now,
        status: OrderStatus::Pending,
    })
    .unwrap();
    repo.update_player_days(player.id, 1).unwrap();

    persist_journal(pool.pool(), &repo.take_journal())
        .await
        .unwrap();

    // Close the session in a second flush, as the engine would.
    repo.end_session(
        session.id,
        SessionEnd {
            reason: GameOverReason::Strike,
            final_meters: MeterSnapshot {
                stock: 47,
                satisfaction: 55,
                profit: 63,
                morale: 0,
            },
            final_day: 1,
            ended_at: now,
        },
    )
    .unwrap();
    let second = repo.take_journal();
    assert_eq!(second.sessions.len(), 1);
    persist_journal(pool.pool(), &second).await.unwrap();

    let ledger = LedgerStore::new(pool.pool());
    let sales = ledger.transactions_for_item(ItemId::new(1)).await.unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id, tx.id);
    assert_eq!(sales[0].total_cost, Decimal::new(75, 1));
    let orders = ledger.load_supplier_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].cost, Decimal::new(30, 0));

    let logs = DecisionStore::new(pool.pool())
        .decisions_for_player(player.id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].resolution, Resolution::TimedOut);
    assert_eq!(logs[1].resolution, Resolution::Chosen(ChoiceSide::Left));
    assert_eq!(logs[1].item_id, Some(ItemId::new(2)));

    let stored = SessionStore::new(pool.pool())
        .get_session(session.id)
        .await
        .unwrap()
        .expect("session row");
    assert_eq!(stored.end_reason, Some(GameOverReason::Strike));
    assert_eq!(stored.final_meters.morale, 0);
    assert!(!stored.is_open());

    let hydration = load_hydration(pool.pool()).await.unwrap();
    assert_eq!(hydration.items.len(), 5);
    assert_eq!(hydration.players.len(), 1);
    assert_eq!(hydration.sessions.len(), 1);
    assert_eq!(hydration.watermarks.customer, customer.get());
    assert_eq!(hydration.watermarks.decision, 2);

    let resumed = MemoryRepository::hydrated(hydration);
    let milk = resumed.get_item(ItemId::new(1)).unwrap();
    assert_eq!(milk.stock_level, 47);
    assert_eq!(milk.sales_count, 3);
    assert_eq!(resumed.get_item(ItemId::new(2)).unwrap().stock_level, 70);
    assert_eq!(resumed.find_player("You").unwrap().unwrap().days_survived, 1);
}

#[tokio::test]
async fn open_sessions_are_not_hydrated() {
    let pool = setup().await;
    let mut repo = seeded_repo();
    let player = repo.create_player("You").unwrap();
    let session = repo.start_session(player.id, Utc::now()).unwrap();
    persist_journal(pool.pool(), &repo.take_journal())
        .await
        .unwrap();

    let hydration = load_hydration(pool.pool()).await.unwrap();
    assert!(hydration.sessions.is_empty());

    let mut resumed = MemoryRepository::hydrated(hydration);
    assert!(resumed.open_session(player.id).unwrap().is_none());
    let fresh = resumed.start_session(player.id, Utc::now()).unwrap();
    assert_ne!(fresh.id, session.id);
}

#[tokio::test]
async fn failed_flush_commits_nothing_and_can_be_retried() {
    let pool = setup().await;
    let mut repo = seeded_repo();
    let customer = repo.create_customer("James Lee", 50).unwrap();
    let mut journal = repo.take_journal();

    // A purchase of an item that does not exist violates the foreign key.
    let mut orphan = journal.clone();
    orphan.transactions.push(supermart_types::Transaction {
        id: supermart_types::TransactionId::new(1),
        customer_id: customer,
        item_id: ItemId::new(404),
        quantity: 1,
        total_cost: Decimal::ONE,
        purchased_at: Utc::now(),
        satisfaction_change: 5,
    });
    let err = persist_journal(pool.pool(), &orphan).await.unwrap_err();
    assert!(matches!(
        err,
        PersistError::Write {
            stage: "transactions",
            ..
        }
    ));
    let items = InventoryStore::new(pool.pool()).load_items().await.unwrap();
    assert!(items.is_empty(), "rolled back flush left rows behind");

    repo.requeue_journal(journal.clone());
    journal = repo.take_journal();
    persist_journal(pool.pool(), &journal).await.unwrap();
    let customers = InventoryStore::new(pool.pool())
        .load_customers()
        .await
        .unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "James Lee");
}
