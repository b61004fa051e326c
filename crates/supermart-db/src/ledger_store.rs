//! Purchase and supplier-order persistence.
//!
//! Both tables are append-only money trails: a `transactions` row for every
//! sale and a `supplier_orders` row for every restock. Rows are flushed
//! with the rest of a journal and never updated.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use supermart_types::{
    CustomerId, ItemId, OrderStatus, SupplierOrder, SupplierOrderId, Transaction, TransactionId,
};

use crate::error::{DbError, to_decimal, to_i32, to_u32};

/// Operations on the `transactions` and `supplier_orders` tables.
pub struct LedgerStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LedgerStore<'a> {
    /// Create a new ledger store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append purchases. Rows already present are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn insert_transactions(
        conn: &mut SqliteConnection,
        transactions: &[Transaction],
    ) -> Result<(), DbError> {
        for tx in transactions {
            sqlx::query(
                r"INSERT INTO transactions
                  (id, customer_id, item_id, quantity, total_cost, purchased_at, satisfaction_change)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(tx.id.get())
            .bind(tx.customer_id.get())
            .bind(tx.item_id.get())
            .bind(i64::from(tx.quantity))
            .bind(tx.total_cost.to_string())
            .bind(tx.purchased_at)
            .bind(tx.satisfaction_change)
            .execute(&mut *conn)
            .await?;
        }
        if !transactions.is_empty() {
            tracing::debug!(count = transactions.len(), "Inserted transactions");
        }
        Ok(())
    }

    /// Append supplier orders. Rows already present are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn insert_supplier_orders(
        conn: &mut SqliteConnection,
        orders: &[SupplierOrder],
    ) -> Result<(), DbError> {
        for order in orders {
            sqlx::query(
                r"INSERT INTO supplier_orders (id, item_id, quantity, cost, ordered_at, status)
                  VALUES ($1, $2, $3, $4, $5, $6)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(order.id.get())
            .bind(order.item_id.get())
            .bind(i64::from(order.quantity))
            .bind(order.cost.to_string())
            .bind(order.ordered_at)
            .bind(order.status.as_str())
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Every purchase of one item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn transactions_for_item(&self, item_id: ItemId) -> Result<Vec<Transaction>, DbError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r"SELECT id, customer_id, item_id, quantity, total_cost, purchased_at, satisfaction_change
              FROM transactions
              WHERE item_id = $1
              ORDER BY id",
        )
        .bind(item_id.get())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Every supplier order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn load_supplier_orders(&self) -> Result<Vec<SupplierOrder>, DbError> {
        let rows = sqlx::query_as::<_, SupplierOrderRow>(
            r"SELECT id, item_id, quantity, cost, ordered_at, status
              FROM supplier_orders
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(SupplierOrder::try_from).collect()
    }
}

/// A row from the `transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Transaction id.
    pub id: i64,
    /// Buyer.
    pub customer_id: i64,
    /// Item bought.
    pub item_id: i64,
    /// Units bought.
    pub quantity: i64,
    /// Total price as decimal text.
    pub total_cost: String,
    /// Purchase time.
    pub purchased_at: DateTime<Utc>,
    /// Satisfaction credited.
    pub satisfaction_change: i64,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DbError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TransactionId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            item_id: ItemId::new(row.item_id),
            quantity: to_u32("quantity", row.quantity)?,
            total_cost: to_decimal("total_cost", &row.total_cost)?,
            purchased_at: row.purchased_at,
            satisfaction_change: to_i32("satisfaction_change", row.satisfaction_change)?,
        })
    }
}

/// A row from the `supplier_orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierOrderRow {
    /// Order id.
    pub id: i64,
    /// Item restocked.
    pub item_id: i64,
    /// Units ordered.
    pub quantity: i64,
    /// Cost as decimal text.
    pub cost: String,
    /// Order time.
    pub ordered_at: DateTime<Utc>,
    /// Order status name.
    pub status: String,
}

impl TryFrom<SupplierOrderRow> for SupplierOrder {
    type Error = DbError;

    fn try_from(row: SupplierOrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SupplierOrderId::new(row.id),
            item_id: ItemId::new(row.item_id),
            quantity: to_u32("quantity", row.quantity)?,
            cost: to_decimal("cost", &row.cost)?,
            ordered_at: row.ordered_at,
            status: OrderStatus::from_str(&row.status).map_err(|e| DbError::decode("status", e))?,
        })
    }
}
