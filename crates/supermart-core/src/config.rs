//! Configuration loading and typed config structures for the store.
//!
//! The canonical configuration lives in `supermart-config.yaml` at the
//! project root. Every field has a default matching the shipped game, so a
//! missing or empty file still yields a playable store.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The YAML parsed but a value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the value.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level store configuration.
///
/// Mirrors the structure of `supermart-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    /// Session timing and player settings.
    #[serde(default)]
    pub game: GameConfig,

    /// Meter economy parameters.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Low-stock restock policy.
    #[serde(default)]
    pub restock: RestockConfig,

    /// Walk-in customer generation.
    #[serde(default)]
    pub customers: CustomerConfig,

    /// Items seeded into an empty store.
    #[serde(default = "default_catalog")]
    pub catalog: Vec<CatalogItem>,

    /// Which crisis catalog to draw from.
    #[serde(default)]
    pub crises: CrisisConfig,

    /// Durable store connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            economy: EconomyConfig::default(),
            restock: RestockConfig::default(),
            customers: CustomerConfig::default(),
            catalog: default_catalog(),
            crises: CrisisConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DATABASE_URL` overrides `database.url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.database.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty string yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            reason: reason.to_owned(),
        };

        if self.game.day_duration_ms == 0
            || self.game.crisis_interval_ms == 0
            || self.game.decision_timeout_ms == 0
            || self.game.customer_interval_ms == 0
            || self.game.tick_interval_ms == 0
        {
            return Err(invalid("game intervals must be non-zero"));
        }
        if self.game.time_scale == 0 {
            return Err(invalid("game.time_scale must be at least 1"));
        }
        if self.economy.daily_depletion_min >= self.economy.daily_depletion_max {
            return Err(invalid(
                "economy.daily_depletion_min must be below daily_depletion_max",
            ));
        }
        if self.database.connect_timeout_secs == 0 {
            return Err(invalid("database.connect_timeout_secs must be non-zero"));
        }
        if self.restock.quantity == 0 {
            return Err(invalid("restock.quantity must be positive"));
        }
        if self.customers.names.is_empty() {
            return Err(invalid("customers.names must not be empty"));
        }
        if self.customers.loyalty_min >= self.customers.loyalty_max {
            return Err(invalid("customers.loyalty_min must be below loyalty_max"));
        }
        if self.customers.max_quantity == 0 {
            return Err(invalid("customers.max_quantity must be at least 1"));
        }
        if let Some(item) = self.catalog.iter().find(|i| i.unit_price <= Decimal::ZERO) {
            return Err(ConfigError::Invalid {
                reason: format!("catalog item {} must have a positive unit_price", item.name),
            });
        }
        Ok(())
    }
}

/// Session timing and player settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Username of the local player profile.
    #[serde(default = "default_player_username")]
    pub player_username: String,

    /// Random seed for reproducible sessions.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Game milliseconds per day.
    #[serde(default = "default_day_duration_ms")]
    pub day_duration_ms: u64,

    /// Game milliseconds between random crises.
    #[serde(default = "default_crisis_interval_ms")]
    pub crisis_interval_ms: u64,

    /// Game milliseconds a decision stays open before it times out.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Game milliseconds between walk-in customers.
    #[serde(default = "default_customer_interval_ms")]
    pub customer_interval_ms: u64,

    /// Game milliseconds per real millisecond in the engine loop.
    #[serde(default = "default_time_scale")]
    pub time_scale: u32,

    /// Stop the engine after this many days (0 = until game over).
    #[serde(default)]
    pub max_days: u32,

    /// Real-time milliseconds between engine loop iterations.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl GameConfig {
    /// Day length as a [`Duration`].
    pub const fn day_duration(&self) -> Duration {
        Duration::from_millis(self.day_duration_ms)
    }

    /// Crisis interval as a [`Duration`].
    pub const fn crisis_interval(&self) -> Duration {
        Duration::from_millis(self.crisis_interval_ms)
    }

    /// Decision timeout as a [`Duration`].
    pub const fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    /// Customer interval as a [`Duration`].
    pub const fn customer_interval(&self) -> Duration {
        Duration::from_millis(self.customer_interval_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_username: default_player_username(),
            seed: default_seed(),
            day_duration_ms: default_day_duration_ms(),
            crisis_interval_ms: default_crisis_interval_ms(),
            decision_timeout_ms: default_decision_timeout_ms(),
            customer_interval_ms: default_customer_interval_ms(),
            time_scale: default_time_scale(),
            max_days: 0,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Meter economy parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Smallest daily stock depletion (inclusive).
    #[serde(default = "default_daily_depletion_min")]
    pub daily_depletion_min: i32,

    /// Largest daily stock depletion (exclusive).
    #[serde(default = "default_daily_depletion_max")]
    pub daily_depletion_max: i32,

    /// Satisfaction gained per completed purchase.
    #[serde(default = "default_purchase_satisfaction_bonus")]
    pub purchase_satisfaction_bonus: i32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            daily_depletion_min: default_daily_depletion_min(),
            daily_depletion_max: default_daily_depletion_max(),
            purchase_satisfaction_bonus: default_purchase_satisfaction_bonus(),
        }
    }
}

/// Low-stock restock policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestockConfig {
    /// Items with fewer units than this are low on stock.
    #[serde(default = "default_restock_threshold")]
    pub threshold: u32,

    /// Units added by one restock.
    #[serde(default = "default_restock_quantity")]
    pub quantity: u32,

    /// Profit meter cost of one restock.
    #[serde(default = "default_restock_profit_cost")]
    pub profit_cost: i32,
}

impl Default for RestockConfig {
    fn default() -> Self {
        Self {
            threshold: default_restock_threshold(),
            quantity: default_restock_quantity(),
            profit_cost: default_restock_profit_cost(),
        }
    }
}

/// Walk-in customer generation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerConfig {
    /// Names drawn at random for new customers.
    #[serde(default = "default_customer_names")]
    pub names: Vec<String>,

    /// Smallest loyalty balance (inclusive).
    #[serde(default = "default_loyalty_min")]
    pub loyalty_min: u32,

    /// Largest loyalty balance (exclusive).
    #[serde(default = "default_loyalty_max")]
    pub loyalty_max: u32,

    /// Most units a walk-in buys at once.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
}

impl Default for CustomerConfig {
    fn default() -> Self {
        Self {
            names: default_customer_names(),
            loyalty_min: default_loyalty_min(),
            loyalty_max: default_loyalty_max(),
            max_quantity: default_max_quantity(),
        }
    }
}

/// An item seeded into an empty store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogItem {
    /// Product name.
    pub name: String,

    /// Units on the shelf at seed time.
    #[serde(default = "default_seed_stock")]
    pub stock_level: u32,

    /// Price per unit.
    pub unit_price: Decimal,

    /// Shelf x coordinate.
    #[serde(default)]
    pub x: f32,

    /// Shelf y coordinate.
    #[serde(default)]
    pub y: f32,
}

impl CatalogItem {
    fn new(name: &str, unit_price: Decimal, x: f32) -> Self {
        Self {
            name: name.to_owned(),
            stock_level: default_seed_stock(),
            unit_price,
            x,
            y: 2.0,
        }
    }
}

/// Which built-in crisis catalog the store uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisCatalogKind {
    /// The five supermarket crises.
    #[default]
    Supermarket,
    /// The two car-wash crises.
    CarWash,
}

/// Crisis selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrisisConfig {
    /// The catalog crises are drawn from.
    #[serde(default)]
    pub catalog: CrisisCatalogKind,
}

/// Durable store connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Connection timeout as a [`Duration`].
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }


    /// Override the database URL with `DATABASE_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.url = val;
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_player_username() -> String {
    "You".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_day_duration_ms() -> u64 {
    60_000
}

const fn default_crisis_interval_ms() -> u64 {
    30_000
}

const fn default_decision_timeout_ms() -> u64 {
    10_000
}

const fn default_customer_interval_ms() -> u64 {
    5_000
}

const fn default_time_scale() -> u32 {
    1
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_daily_depletion_min() -> i32 {
    5
}

const fn default_daily_depletion_max() -> i32 {
    15
}

const fn default_purchase_satisfaction_bonus() -> i32 {
    5
}

const fn default_restock_threshold() -> u32 {
    10
}

const fn default_restock_quantity() -> u32 {
    20
}

const fn default_restock_profit_cost() -> i32 {
    5
}

fn default_customer_names() -> Vec<String> {
    [
        "Emma Davis",
        "Liam Wilson",
        "Olivia Brown",
        "Noah Taylor",
        "Ava Clark",
        "Sophia Lee",
        "James White",
        "Mia Harris",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

const fn default_loyalty_min() -> u32 {
    10
}

const fn default_loyalty_max() -> u32 {
    100
}

const fn default_max_quantity() -> u32 {
    3
}

const fn default_seed_stock() -> u32 {
    50
}

fn default_catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem::new("Milk", Decimal::new(25, 1), 2.0),
        CatalogItem::new("Bread", Decimal::new(15, 1), 3.0),
        CatalogItem::new("Apple", Decimal::new(5, 1), 4.0),
        CatalogItem::new("Eggs", Decimal::new(30, 1), 5.0),
        CatalogItem::new("Cheese", Decimal::new(40, 1), 6.0),
    ]
}

fn default_database_url() -> String {
    "sqlite://supermart.db".to_owned()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_shipped_game() {
        let config = StoreConfig::default();
        assert_eq!(config.game.player_username, "You");
        assert_eq!(config.game.day_duration(), Duration::from_secs(60));
        assert_eq!(config.game.crisis_interval(), Duration::from_secs(30));
        assert_eq!(config.game.decision_timeout(), Duration::from_secs(10));
        assert_eq!(config.game.customer_interval(), Duration::from_secs(5));
        assert_eq!(config.economy.daily_depletion_min, 5);
        assert_eq!(config.economy.daily_depletion_max, 15);
        assert_eq!(config.restock.threshold, 10);
        assert_eq!(config.restock.quantity, 20);
        assert_eq!(config.restock.profit_cost, 5);
        assert_eq!(config.customers.names.len(), 8);
        assert_eq!(config.catalog.len(), 5);
        assert_eq!(config.crises.catalog, CrisisCatalogKind::Supermarket);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_catalog_prices() {
        let config = StoreConfig::default();
        let milk = config.catalog.first().unwrap();
        assert_eq!(milk.name, "Milk");
        assert_eq!(milk.unit_price, Decimal::new(25, 1));
        assert_eq!(milk.stock_level, 50);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r#"
game:
  seed: 7
  time_scale: 10
crises:
  catalog: car_wash
logging:
  format: json
catalog:
  - name: "Soap"
    unit_price: 1.25
"#;
        let config = StoreConfig::parse(yaml).unwrap();
        assert_eq!(config.game.seed, 7);
        assert_eq!(config.game.time_scale, 10);
        assert_eq!(config.game.day_duration_ms, 60_000);
        assert_eq!(config.crises.catalog, CrisisCatalogKind::CarWash);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.catalog.len(), 1);
        assert_eq!(config.catalog.first().map(|c| c.stock_level), Some(50));
    }

    #[test]
    fn parse_empty_yaml() {
        let config = StoreConfig::parse("").unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn inverted_depletion_range_is_invalid() {
        let yaml = "economy:\n  daily_depletion_min: 15\n  daily_depletion_max: 5\n";
        assert!(matches!(
            StoreConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn zero_tick_interval_is_invalid() {
        let mut config = StoreConfig::default();
        config.game.tick_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { reason }) if reason.contains("intervals")
        ));
        assert!(matches!(
            StoreConfig::parse("game:\n  tick_interval_ms: 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn database_connect_timeout() {
        let config = StoreConfig::parse("database:\n  connect_timeout_secs: 12\n").unwrap();
        assert_eq!(config.database.connect_timeout(), Duration::from_secs(12));
        assert_eq!(
            StoreConfig::default().database.connect_timeout(),
            Duration::from_secs(5)
        );
        assert!(matches!(
            StoreConfig::parse("database:\n  connect_timeout_secs: 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn zero_priced_item_is_invalid() {
        let yaml = "catalog:\n  - name: Free\n    unit_price: 0\n";
        assert!(matches!(
            StoreConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("supermart-config.yaml");
        if path.exists() {
            let config = StoreConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
