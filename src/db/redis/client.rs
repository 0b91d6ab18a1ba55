use anyhow::Context;
use log::{info, warn};
use redis::aio::ConnectionManager;

use crate::config::RedisSettings;

/// Redis client over one long-lived multiplexed connection.
///
/// Built once at process start and shared behind an `Arc`. The
/// `ConnectionManager` re-establishes the underlying socket on its own, so
/// callers simply clone it per command.
#[derive(Clone)]
pub struct RedisClient {
    pub manager: ConnectionManager,
}

impl RedisClient {
    pub async fn new(settings: RedisSettings) -> anyhow::Result<Self> {
        info!("Connecting to Redis");

        let client = redis::Client::open(settings.url.as_str()).context("Invalid Redis URL")?;

        let mut retries = 0;
        let max_retries = 3;

        loop {
            match ConnectionManager::new(client.clone()).await {
                Ok(manager) => {
                    info!("Successfully connected to Redis");
                    return Ok(Self { manager });
                },
                Err(e) => {
                    retries += 1;

                    if retries >= max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to Redis after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }

                    let delay = std::time::Duration::from_millis(100 * 2_u64.pow(retries));
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}), retrying in {:?}...",
                        retries, max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    /// Health check - verify connection is still alive
    pub async fn health_check(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}
