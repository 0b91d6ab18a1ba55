use crate::db::CacheStore;
use crate::error::CacheError;

/// Reserved cache key holding the last fully backfilled block.
pub const SYS_LAST_BLOCK_KEY: &str = "SYS:lastBlock";

/// Backfill sync cursor.
///
/// Tracks the last block whose logs were fully replayed into the cache.
/// Stored as a plain decimal string under [`SYS_LAST_BLOCK_KEY`] so it
/// survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncCheckpoint {
    pub last_indexed_block: u64,
}

impl SyncCheckpoint {
    pub fn new(last_indexed_block: u64) -> Self {
        Self { last_indexed_block }
    }

    /// Read the persisted cursor. `None` means no pass has ever completed.
    pub async fn load(store: &dyn CacheStore) -> Result<Option<Self>, CacheError> {
        match store.get(SYS_LAST_BLOCK_KEY).await? {
            Some(raw) => {
                let block = raw.trim().parse::<u64>().map_err(|_| {
                    CacheError::Backend(format!(
                        "invalid value {:?} stored under {}",
                        raw, SYS_LAST_BLOCK_KEY
                    ))
                })?;
                Ok(Some(Self::new(block)))
            },
            None => Ok(None),
        }
    }

    pub async fn save(&self, store: &dyn CacheStore) -> Result<(), CacheError> {
        store
            .set(SYS_LAST_BLOCK_KEY, &self.last_indexed_block.to_string())
            .await
    }
}
