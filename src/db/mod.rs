use async_trait::async_trait;

use crate::error::CacheError;

pub mod models;
pub mod redis;

#[cfg(test)]
pub(crate) mod memory;

pub use self::redis::RedisClient;

/// Key-value store holding the latest metadata per account and the sync
/// cursor.
///
/// Every write is an idempotent overwrite, so no locking is needed beyond the
/// store's own per-command atomicity. `mset` is all-or-nothing from the
/// caller's point of view.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    async fn mset(&self, entries: &[(String, String)]) -> Result<(), CacheError>;
}
