use alloy::primitives::Address;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Redis connection configuration.
///
/// Redis holds the latest metadata per account plus the sync cursor.
#[derive(Debug, Deserialize, Clone)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1/".to_string()
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

/// Etherscan-compatible indexing API used for historical backfills.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    #[serde(default = "default_indexer_url")]
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_indexer_url() -> String {
    "https://api-sepolia.etherscan.io/api".to_string()
}

fn default_page_size() -> usize {
    1_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Websocket node provider and reconnect tuning.
///
/// Backoff delay for attempt `n` is
/// `min_reconnect_delay_ms * reconnect_backoff_factor^(n - 1)`, capped at
/// `max_reconnect_delay_ms`.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub ws_url: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_backoff_factor")]
    pub reconnect_backoff_factor: f64,
    #[serde(default = "default_min_reconnect_delay_ms")]
    pub min_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_backoff_factor() -> f64 {
    1.3
}

fn default_min_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

/// The watched AccountManager contract.
#[derive(Debug, Deserialize, Clone)]
pub struct ContractSettings {
    pub address: Address,
}

/// Off-chain name registry (Firestore REST).
#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySettings {
    pub project_id: String,
    /// Point at the local Firestore emulator instead of the hosted API
    #[serde(default)]
    pub dev: bool,
}

/// Root application configuration.
///
/// Loaded from an optional `config.yaml` at startup, then overridden by
/// `METASYNC_*` environment variables (`__` separates sections, e.g.
/// `METASYNC_INDEXER__API_KEY`).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub redis: RedisSettings,
    pub indexer: IndexerSettings,
    pub stream: StreamSettings,
    pub contract: ContractSettings,
    #[serde(default)]
    pub registry: Option<RegistrySettings>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `METASYNC_` prefix, `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix("METASYNC")
        .prefix_separator("_")
        .separator("__")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(environment())
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
