//! Configuration for the ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Proof-of-work configuration
    pub mining: MiningConfig,

    /// Admission limits and bonding-curve constants
    pub market: MarketConfig,

    /// Writer actor configuration
    pub actor: ActorConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "curve-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDBConfig::default(),
            mining: MiningConfig::default(),
            market: MarketConfig::default(),
            actor: ActorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 2,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Proof-of-work configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Leading zero hex digits required on every non-genesis hash
    pub difficulty: usize,

    /// Failed attempts before the candidate timestamp is refreshed
    pub timestamp_refresh_attempts: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: 2,
            timestamp_refresh_attempts: 100_000,
        }
    }
}

/// Admission limits and curve constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Largest amount a single transfer may move
    pub max_transaction_amount: Decimal,

    /// Cap on circulating supply
    pub max_coin_supply: Decimal,

    /// Curve base price
    pub initial_price: Decimal,

    /// Fraction added to buy and removed from sell
    pub spread: Decimal,

    /// Curve steepness
    pub curve_k: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            max_transaction_amount: Decimal::from(1_000),
            max_coin_supply: Decimal::from(1_000_000),
            initial_price: Decimal::ONE,
            spread: Decimal::new(5, 1),  // 0.5
            curve_k: Decimal::new(1, 2), // 0.01
        }
    }
}

/// Writer actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure on submitters)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(difficulty) = std::env::var("LEDGER_DIFFICULTY") {
            config.mining.difficulty = difficulty
                .parse()
                .map_err(|e| crate::Error::Config(format!("LEDGER_DIFFICULTY: {}", e)))?;
        }

        if let Ok(max) = std::env::var("LEDGER_MAX_TRANSACTION_AMOUNT") {
            config.market.max_transaction_amount = max.parse().map_err(|e| {
                crate::Error::Config(format!("LEDGER_MAX_TRANSACTION_AMOUNT: {}", e))
            })?;
        }

        if let Ok(max) = std::env::var("LEDGER_MAX_COIN_SUPPLY") {
            config.market.max_coin_supply = max
                .parse()
                .map_err(|e| crate::Error::Config(format!("LEDGER_MAX_COIN_SUPPLY: {}", e)))?;
        }

        if let Ok(filter) = std::env::var("LEDGER_LOG_FILTER") {
            config.logging.filter = filter;
        }

        if let Ok(json) = std::env::var("LEDGER_LOG_JSON") {
            config.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        let fail = |msg: &str| Err(crate::Error::Config(msg.to_string()));

        // A SHA-256 hex digest has 64 digits
        if self.mining.difficulty > 64 {
            return fail("mining.difficulty must be at most 64");
        }
        if self.mining.timestamp_refresh_attempts == 0 {
            return fail("mining.timestamp_refresh_attempts must be positive");
        }
        if self.market.spread < Decimal::ZERO || self.market.spread >= Decimal::ONE {
            return fail("market.spread must be in [0, 1)");
        }
        if self.market.initial_price <= Decimal::ZERO {
            return fail("market.initial_price must be positive");
        }
        if self.market.curve_k < Decimal::ZERO {
            return fail("market.curve_k must be non-negative");
        }
        if self.market.max_transaction_amount < Decimal::ZERO
            || self.market.max_coin_supply < Decimal::ZERO
        {
            return fail("market limits must be non-negative");
        }
        if self.actor.mailbox_capacity == 0 {
            return fail("actor.mailbox_capacity must be positive");
        }

        Ok(())
    }
}
