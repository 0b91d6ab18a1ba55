//! Error taxonomy for the synchronization engine.
//!
//! Decode failures abort a backfill pass but only skip a live event.
//! Upstream query failures abort the current pass and are retried from the
//! persisted cursor on the next trigger. Transport failures drive the
//! reconnect loop; running out of attempts is the only fatal condition.

use thiserror::Error;

/// A raw log did not match the `NewMetadata` event shape.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log has no topics")]
    MissingTopic,

    #[error("unexpected topic0 {found}, expected {expected}")]
    UnexpectedTopic { expected: String, found: String },

    #[error("log carries {0} topics, at most 4 are allowed")]
    TooManyTopics(usize),

    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("log is missing its {0}")]
    MissingPosition(&'static str),

    #[error("ABI decoding failed: {0}")]
    Abi(#[from] alloy::sol_types::Error),
}

/// Failure talking to the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to decode log {log_id}: {source}")]
    Decode {
        log_id: String,
        #[source]
        source: DecodeError,
    },

    #[error("indexing API query failed: {0}")]
    UpstreamQuery(String),

    #[error("indexing API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("websocket connection failed after {0} attempts")]
    ReconnectExhausted(u32),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("service is shutting down")]
    Shutdown,
}

impl SyncError {
    /// Only reconnect exhaustion takes the process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::ReconnectExhausted(_))
    }
}

/// Failure resolving a username to a public key.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidName(&'static str),

    #[error("name not registered")]
    NotRegistered,

    #[error("registry error: {0}")]
    Registry(String),

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl ResolveError {
    /// HTTP status an embedding server should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ResolveError::InvalidName(_) => 400,
            ResolveError::NotRegistered => 404,
            _ => 500,
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
