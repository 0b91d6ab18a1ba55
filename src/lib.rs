pub mod abis;
pub mod config;
pub mod db;
pub mod error;
pub mod resolver;
pub mod utils;
pub mod worker;

pub use self::config::Settings;
pub use self::db::{CacheStore, RedisClient};
pub use self::error::{CacheError, DecodeError, ResolveError, SyncError};
pub use self::resolver::{RegistryClient, Resolver};
pub use self::worker::{ConnectionState, ConnectionSupervisor};
