//! Live subscription listener.
//!
//! Applies each streamed `NewMetadata` log to the cache as it arrives. A
//! log that fails to decode is logged and skipped; losing one live event is
//! preferable to losing the stream, and the next backfill replays it anyway.

use std::sync::Arc;

use alloy::rpc::types::Log;
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    db::CacheStore,
    error::{CacheError, SyncError},
    worker::{
        parser::{self, RawLog},
        stream::LogStream,
    },
};

/// Why a listener task stopped.
#[derive(Debug)]
pub enum ListenerExit {
    /// The underlying stream ended, i.e. the transport went away
    StreamEnded,
    /// Torn down through its handle
    Detached,
    Failed(SyncError),
}

#[derive(Clone)]
pub struct Listener {
    cache: Arc<dyn CacheStore>,
}

impl Listener {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Start applying `stream` to the cache.
    ///
    /// Runs until the stream ends, a cache write fails, or the returned
    /// handle is detached.
    pub fn attach(&self, stream: LogStream) -> ListenerHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(self.cache.clone(), stream, token.clone()));

        info!("Live listener attached");

        ListenerHandle {
            token,
            task: Some(task),
            attached: true,
        }
    }
}

async fn run(
    cache: Arc<dyn CacheStore>,
    mut stream: LogStream,
    token: CancellationToken,
) -> ListenerExit {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return ListenerExit::Detached,
            next = stream.next() => match next {
                Some(log) => {
                    if let Err(e) = apply(cache.as_ref(), &log).await {
                        return ListenerExit::Failed(e.into());
                    }
                },
                None => return ListenerExit::StreamEnded,
            },
        }
    }
}

/// Decode and write one live log.
///
/// Only cache failures are errors here.
pub async fn apply(cache: &dyn CacheStore, log: &Log) -> Result<(), CacheError> {
    let raw = RawLog::from(log);
    if raw.removed {
        debug!("Skipping removed log {}", raw.id());
        return Ok(());
    }

    match parser::parse_log(&raw) {
        Ok(event) => {
            let (account, metadata) = event.cache_entry();
            debug!("======> {} <-> {}", account, metadata);
            cache.set(&account, &metadata).await
        },
        Err(e) => {
            warn!("Skipping undecodable live log {}: {}", raw.id(), e);
            Ok(())
        },
    }
}

/// Registration of one attached listener.
///
/// Detaching is idempotent, so reconnect code can always detach before it
/// re-attaches.
pub struct ListenerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<ListenerExit>>,
    attached: bool,
}

impl ListenerHandle {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Stop the listener. Returns whether it was still attached.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        self.attached = false;
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        true
    }

    /// Wait for the listener task to stop on its own.
    ///
    /// Cancel safe; the handle stays attached until [`detach`](Self::detach).
    pub async fn closed(&mut self) -> ListenerExit {
        let Some(task) = self.task.as_mut() else {
            return ListenerExit::Detached;
        };
        let exit = match task.await {
            Ok(exit) => exit,
            Err(e) => ListenerExit::Failed(SyncError::Transport(format!(
                "listener task failed: {}",
                e
            ))),
        };
        self.task = None;
        exit
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::memory::{MemoryStore, Write},
        utils::hex_encode,
        worker::parser::fixtures::{account, metadata, rpc_log},
    };
    use alloy::primitives::B256;
    use futures::channel::mpsc;

    #[tokio::test]
    async fn test_applies_live_events_in_delivery_order() {
        let store = Arc::new(MemoryStore::new());
        let listener = Listener::new(store.clone());
        let (tx, rx) = mpsc::unbounded();

        let mut handle = listener.attach(rx.boxed());
        tx.unbounded_send(rpc_log(account(1), metadata(1), 10, 0)).unwrap();
        tx.unbounded_send(rpc_log(account(1), metadata(2), 11, 0)).unwrap();
        tx.close_channel();

        assert!(matches!(handle.closed().await, ListenerExit::StreamEnded));
        assert_eq!(
            store.value(&account(1).to_checksum(None)),
            Some(hex_encode(&metadata(2)))
        );
        assert_eq!(store.writes().len(), 2);
        // The stream ending does not unregister the listener
        assert!(handle.is_attached());
    }

    #[tokio::test]
    async fn test_undecodable_live_log_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let listener = Listener::new(store.clone());
        let (tx, rx) = mpsc::unbounded();

        let mut bad = rpc_log(account(1), metadata(1), 10, 0);
        bad.inner.data = alloy::primitives::LogData::new_unchecked(
            vec![B256::repeat_byte(0x99)],
            Default::default(),
        );

        let mut handle = listener.attach(rx.boxed());
        tx.unbounded_send(bad).unwrap();
        tx.unbounded_send(rpc_log(account(2), metadata(5), 12, 1)).unwrap();
        tx.close_channel();

        assert!(matches!(handle.closed().await, ListenerExit::StreamEnded));
        assert_eq!(
            store.writes(),
            vec![Write::Set(
                account(2).to_checksum(None),
                hex_encode(&metadata(5))
            )]
        );
    }

    #[tokio::test]
    async fn test_removed_log_is_not_applied() {
        let store = Arc::new(MemoryStore::new());
        let mut log = rpc_log(account(1), metadata(1), 10, 0);
        log.removed = true;

        apply(store.as_ref(), &log).await.unwrap();
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_cache_failure_stops_listener() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let listener = Listener::new(store.clone());
        let (tx, rx) = mpsc::unbounded();

        let mut handle = listener.attach(rx.boxed());
        tx.unbounded_send(rpc_log(account(1), metadata(1), 10, 0)).unwrap();

        assert!(matches!(
            handle.closed().await,
            ListenerExit::Failed(SyncError::Cache(_))
        ));
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let listener = Listener::new(store.clone());
        let (tx, rx) = mpsc::unbounded::<Log>();

        let mut handle = listener.attach(rx.boxed());
        assert!(handle.detach());
        assert!(!handle.detach());
        assert!(!handle.is_attached());
        assert!(matches!(handle.closed().await, ListenerExit::Detached));

        // Nothing is applied after detaching
        let _ = tx.unbounded_send(rpc_log(account(1), metadata(1), 10, 0));
        tokio::task::yield_now().await;
        assert!(store.writes().is_empty());
    }
}
