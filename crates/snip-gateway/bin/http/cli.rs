use clap::{Parser, ValueEnum};
use snip_core::CollisionStrategy;
use snip_engine::{ClickPersistence, EngineConfig};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const HASH_CAPACITY_ENV: &str = "SNIP_HASH_CAPACITY";
pub const LRU_CAPACITY_ENV: &str = "SNIP_LRU_CAPACITY";
pub const TOP_K_ENV: &str = "SNIP_TOP_K";
pub const MAX_ATTEMPTS_ENV: &str = "SNIP_MAX_ATTEMPTS";
pub const COLLISION_STRATEGY_ENV: &str = "SNIP_COLLISION_STRATEGY";
pub const CLICK_PERSISTENCE_ENV: &str = "SNIP_CLICK_PERSISTENCE";
pub const STORE_TIMEOUT_MS_ENV: &str = "SNIP_STORE_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Linear,
    Regenerate,
    Append,
}

impl From<StrategyArg> for CollisionStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Linear => CollisionStrategy::Linear,
            StrategyArg::Regenerate => CollisionStrategy::Regenerate,
            StrategyArg::Append => CollisionStrategy::Append,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClickPersistenceArg {
    Synchronous,
    Background,
    Disabled,
}

impl From<ClickPersistenceArg> for ClickPersistence {
    fn from(value: ClickPersistenceArg) -> Self {
        match value {
            ClickPersistenceArg::Synchronous => ClickPersistence::Synchronous,
            ClickPersistenceArg::Background => ClickPersistence::Background,
            ClickPersistenceArg::Disabled => ClickPersistence::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "snip", version, about = "URL shortener HTTP server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public prefix that short codes are appended to.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = HASH_CAPACITY_ENV, default_value_t = 1000)]
    pub hash_capacity: usize,

    #[arg(long, env = LRU_CAPACITY_ENV, default_value_t = 100)]
    pub lru_capacity: usize,

    #[arg(long, env = TOP_K_ENV, default_value_t = 10)]
    pub top_k: usize,

    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = 10)]
    pub max_attempts: u32,

    #[arg(
        long,
        env = COLLISION_STRATEGY_ENV,
        value_enum,
        default_value_t = StrategyArg::Linear
    )]
    pub collision_strategy: StrategyArg,

    #[arg(
        long,
        env = CLICK_PERSISTENCE_ENV,
        value_enum,
        default_value_t = ClickPersistenceArg::Background
    )]
    pub click_persistence: ClickPersistenceArg,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = 5000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

impl CLI {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::builder()
            .hash_capacity(self.hash_capacity)
            .lru_capacity(self.lru_capacity)
            .top_k(self.top_k)
            .max_attempts(self.max_attempts)
            .default_strategy(self.collision_strategy.into())
            .click_persistence(self.click_persistence.into())
            .store_timeout(Duration::from_millis(self.store_timeout_ms))
            .base_url(self.base_url.clone())
            .build()
    }
}
