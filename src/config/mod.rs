mod config;

pub use self::config::{
    ContractSettings, IndexerSettings, RedisSettings, RegistrySettings, Settings, StreamSettings,
};
