use async_trait::async_trait;
use redis::AsyncCommands;

use crate::db::redis::RedisClient;
use crate::db::CacheStore;
use crate::error::CacheError;

#[async_trait]
impl CacheStore for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    /// Single `MSET`, so Redis applies the whole batch atomically.
    async fn mset(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        conn.mset::<_, _, ()>(entries).await?;
        Ok(())
    }
}
