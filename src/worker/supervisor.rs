use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy::{rpc::types::Filter, sol_types::SolEvent};
use log::{error, info, warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    abis::NewMetadata,
    config::Settings,
    db::{models::SyncCheckpoint, CacheStore},
    error::SyncError,
    utils::Backoff,
    worker::{
        backfill::{BackfillFetcher, BackfillStats},
        listener::{Listener, ListenerExit, ListenerHandle},
        stream::{StreamConnection, StreamConnector, WsConnector},
    },
};

/// Lifecycle of the live streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Counters describing what the supervisor has done so far.
#[derive(Debug, Default)]
pub struct SupervisorStats {
    pub connections: AtomicU64,
    pub disconnects: AtomicU64,
    pub listeners_detached: AtomicU64,
    pub backfill_passes: AtomicU64,
}

/// Owns the streaming connection for one watched contract.
///
/// On every (re)connect it closes the gap with a backfill from the persisted
/// cursor to the current head before attaching the live listener. On every
/// disconnect it drops the listener and reconnects with bounded exponential
/// backoff. Running out of attempts is the only fatal outcome.
pub struct ConnectionSupervisor {
    connector: Arc<dyn StreamConnector>,
    fetcher: BackfillFetcher,
    listener: Listener,
    cache: Arc<dyn CacheStore>,
    filter: Filter,
    backoff: Backoff,
    connect_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    stats: SupervisorStats,
}

impl ConnectionSupervisor {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        fetcher: BackfillFetcher,
        cache: Arc<dyn CacheStore>,
        filter: Filter,
        backoff: Backoff,
        connect_timeout: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            connector,
            fetcher,
            listener: Listener::new(cache.clone()),
            cache,
            filter,
            backoff,
            connect_timeout,
            state_tx,
            stats: SupervisorStats::default(),
        }
    }

    /// Wire a supervisor against the configured websocket provider and
    /// indexing API.
    pub fn from_settings(
        settings: &Settings,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, SyncError> {
        let contract = settings.contract.address;
        let fetcher = BackfillFetcher::new(&settings.indexer, contract, cache.clone())?;
        let filter = Filter::new()
            .address(contract)
            .event_signature(NewMetadata::SIGNATURE_HASH);

        Ok(Self::new(
            Arc::new(WsConnector::new(settings.stream.ws_url.clone())),
            fetcher,
            cache,
            filter,
            Backoff::from_settings(&settings.stream),
            Duration::from_millis(settings.stream.connect_timeout_ms),
        ))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!("Connection state {:?} -> {:?}", previous, state);
        }
    }

    /// Drop the current listener registration, if any.
    fn clear_listener(&self, listener: &mut Option<ListenerHandle>) {
        if let Some(mut handle) = listener.take() {
            if handle.detach() {
                self.stats.listeners_detached.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Backfill from the persisted cursor to `head`, then advance the cursor.
    ///
    /// The cursor only moves after the whole range succeeded and never moves
    /// backwards.
    pub async fn catch_up(
        &self,
        head: u64,
        shutdown: &CancellationToken,
    ) -> Result<BackfillStats, SyncError> {
        let from_block = SyncCheckpoint::load(self.cache.as_ref())
            .await?
            .map(|c| c.last_indexed_block)
            .unwrap_or(0);

        if head < from_block {
            warn!(
                "Chain head {} is behind the sync cursor {}, skipping backfill",
                head, from_block
            );
            return Ok(BackfillStats::default());
        }

        self.stats.backfill_passes.fetch_add(1, Ordering::SeqCst);
        let stats = self.fetcher.backfill(from_block, head, shutdown).await?;

        SyncCheckpoint::new(head).save(self.cache.as_ref()).await?;
        info!("Sync cursor advanced to block {}", head);

        Ok(stats)
    }

    /// Run the `connecting -> open` transition on a fresh connection.
    ///
    /// The subscription is opened first so live logs buffer while the
    /// backfill runs; they are only applied once the listener attaches.
    async fn on_open(
        &self,
        connection: &dyn StreamConnection,
        listener: &mut Option<ListenerHandle>,
        shutdown: &CancellationToken,
    ) -> Result<(), SyncError> {
        self.clear_listener(listener);

        let stream = connection.subscribe_logs(&self.filter).await?;
        let head = connection.block_number().await?;
        info!("Current block is {}", head);

        info!("Restoring historical events...");
        match self.catch_up(head, shutdown).await {
            Ok(_) => info!("All historical events restored"),
            Err(SyncError::Shutdown) => return Err(SyncError::Shutdown),
            Err(e) => {
                warn!(
                    "Backfill up to block {} failed, retrying after next reconnect: {}",
                    head, e
                );
            },
        }

        *listener = Some(self.listener.attach(stream));
        Ok(())
    }

    /// Drive the connection until shutdown or reconnect exhaustion.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), SyncError> {
        let mut listener: Option<ListenerHandle> = None;
        let mut attempt: u32 = 0;

        self.set_state(ConnectionState::Connecting);

        let result = loop {
            if attempt > 0 {
                if self.backoff.exhausted(attempt) {
                    error!(
                        "Giving up on websocket after {} reconnect attempts",
                        self.backoff.max_attempts
                    );
                    break Err(SyncError::ReconnectExhausted(self.backoff.max_attempts));
                }

                let delay = self.backoff.delay(attempt);
                info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay, attempt, self.backoff.max_attempts
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break Ok(()),
                    _ = tokio::time::sleep(delay) => {},
                }
            }

            let connected = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                res = tokio::time::timeout(self.connect_timeout, self.connector.connect()) => {
                    res.unwrap_or_else(|_| {
                        Err(SyncError::Transport(format!(
                            "handshake timed out after {:?}",
                            self.connect_timeout
                        )))
                    })
                },
            };

            let connection = match connected {
                Ok(connection) => connection,
                Err(e) => {
                    warn!("Websocket connection failed: {}", e);
                    attempt += 1;
                    continue;
                },
            };

            self.stats.connections.fetch_add(1, Ordering::SeqCst);
            self.set_state(ConnectionState::Open);

            match self
                .on_open(connection.as_ref(), &mut listener, &shutdown)
                .await
            {
                Ok(()) => {
                    // Reconnects after a live session start over at the first delay
                    attempt = 1;
                    if let Some(handle) = listener.as_mut() {
                        tokio::select! {
                            _ = shutdown.cancelled() => break Ok(()),
                            exit = handle.closed() => match exit {
                                ListenerExit::Failed(e) => warn!("Live listener failed: {}", e),
                                exit => info!("Live stream closed: {:?}", exit),
                            },
                        }
                    }
                },
                Err(SyncError::Shutdown) => break Ok(()),
                Err(e) => {
                    warn!("Failed to arm live subscription: {}", e);
                    attempt += 1;
                },
            }

            // open -> reconnecting
            self.clear_listener(&mut listener);
            drop(connection);
            self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
            self.set_state(ConnectionState::Reconnecting);
        };

        self.clear_listener(&mut listener);
        self.set_state(ConnectionState::Closed);
        result
    }
}
