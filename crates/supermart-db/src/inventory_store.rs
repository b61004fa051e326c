//! Catalog, customer, and player persistence.
//!
//! Items and players are mutable rows and are written with upserts keyed
//! on their id. Customers are append-only.

use sqlx::{SqliteConnection, SqlitePool};
use supermart_types::{Customer, CustomerId, Item, ItemId, Player, PlayerId, ShelfPosition};

use crate::error::{DbError, to_decimal, to_u32};

/// Operations on the `items`, `customers`, and `players` tables.
pub struct InventoryStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InventoryStore<'a> {
    /// Create a new inventory store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Writes (run inside the caller's transaction)
    // =========================================================================

    /// Insert or update every item.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn upsert_items(conn: &mut SqliteConnection, items: &[Item]) -> Result<(), DbError> {
        for item in items {
            sqlx::query(
                r"INSERT INTO items (id, name, stock_level, sales_count, unit_price, shelf_x, shelf_y)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)
                  ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    stock_level = excluded.stock_level,
                    sales_count = excluded.sales_count,
                    unit_price = excluded.unit_price,
                    shelf_x = excluded.shelf_x,
                    shelf_y = excluded.shelf_y",
            )
            .bind(item.id.get())
            .bind(&item.name)
            .bind(i64::from(item.stock_level))
            .bind(i64::from(item.sales_count))
            .bind(item.unit_price.to_string())
            .bind(item.shelf.x)
            .bind(item.shelf.y)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Append customers. Rows already present are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn insert_customers(
        conn: &mut SqliteConnection,
        customers: &[Customer],
    ) -> Result<(), DbError> {
        for customer in customers {
            sqlx::query(
                r"INSERT INTO customers (id, name, loyalty_points)
                  VALUES ($1, $2, $3)
                  ON CONFLICT (id) DO NOTHING",
            )
            .bind(customer.id.get())
            .bind(&customer.name)
            .bind(i64::from(customer.loyalty_points))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Insert or update every player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if a write fails.
    pub async fn upsert_players(
        conn: &mut SqliteConnection,
        players: &[Player],
    ) -> Result<(), DbError> {
        for player in players {
            sqlx::query(
                r"INSERT INTO players (id, username, days_survived)
                  VALUES ($1, $2, $3)
                  ON CONFLICT (id) DO UPDATE SET
                    username = excluded.username,
                    days_survived = excluded.days_survived",
            )
            .bind(player.id.get())
            .bind(&player.username)
            .bind(i64::from(player.days_survived))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every item, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn load_items(&self) -> Result<Vec<Item>, DbError> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r"SELECT id, name, stock_level, sales_count, unit_price, shelf_x, shelf_y
              FROM items
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Item::try_from).collect()
    }

    /// One item by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn get_item(&self, id: ItemId) -> Result<Option<Item>, DbError> {
        let row = sqlx::query_as::<_, ItemRow>(
            r"SELECT id, name, stock_level, sales_count, unit_price, shelf_x, shelf_y
              FROM items
              WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool)
        .await?;
        row.map(Item::try_from).transpose()
    }

    /// Every customer, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn load_customers(&self) -> Result<Vec<Customer>, DbError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            r"SELECT id, name, loyalty_points FROM customers ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Customer::try_from).collect()
    }

    /// Every player, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn load_players(&self) -> Result<Vec<Player>, DbError> {
        let rows = sqlx::query_as::<_, PlayerRow>(
            r"SELECT id, username, days_survived FROM players ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Player::try_from).collect()
    }

    /// Look a player up by username.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn find_player(&self, username: &str) -> Result<Option<Player>, DbError> {
        let row = sqlx::query_as::<_, PlayerRow>(
            r"SELECT id, username, days_survived FROM players WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        row.map(Player::try_from).transpose()
    }

    /// Look a player up by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Decode`] for a malformed row.
    pub async fn get_player(&self, id: PlayerId) -> Result<Option<Player>, DbError> {
        let row = sqlx::query_as::<_, PlayerRow>(
            r"SELECT id, username, days_survived FROM players WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(self.pool)
        .await?;
        row.map(Player::try_from).transpose()
    }
}

/// A row from the `items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ItemRow {
    /// Item id.
    pub id: i64,
    /// Product name.
    pub name: String,
    /// Units on the shelf.
    pub stock_level: i64,
    /// Units sold.
    pub sales_count: i64,
    /// Unit price as decimal text.
    pub unit_price: String,
    /// Shelf x coordinate.
    pub shelf_x: f32,
    /// Shelf y coordinate.
    pub shelf_y: f32,
}

impl TryFrom<ItemRow> for Item {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ItemId::new(row.id),
            name: row.name,
            stock_level: to_u32("stock_level", row.stock_level)?,
            sales_count: to_u32("sales_count", row.sales_count)?,
            unit_price: to_decimal("unit_price", &row.unit_price)?,
            shelf: ShelfPosition {
                x: row.shelf_x,
                y: row.shelf_y,
            },
        })
    }
}

/// A row from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    /// Customer id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Loyalty balance.
    pub loyalty_points: i64,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = DbError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CustomerId::new(row.id),
            name: row.name,
            loyalty_points: to_u32("loyalty_points", row.loyalty_points)?,
        })
    }
}

/// A row from the `players` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlayerRow {
    /// Player id.
    pub id: i64,
    /// Unique username.
    pub username: String,
    /// Days survived in the latest session.
    pub days_survived: i64,
}

impl TryFrom<PlayerRow> for Player {
    type Error = DbError;

    fn try_from(row: PlayerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PlayerId::new(row.id),
            username: row.username,
            days_survived: to_u32("days_survived", row.days_survived)?,
        })
    }
}
