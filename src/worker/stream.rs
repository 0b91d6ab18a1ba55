//! Streaming node provider seam.
//!
//! The supervisor only needs three things from a node: a handshake, the
//! current head, and a log subscription. [`WsConnector`] provides them over
//! an alloy websocket provider.

use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
    pubsub::{ConnectionHandle, PubSubConnect},
    rpc::types::{Filter, Log},
    transports::{TransportErrorKind, TransportResult},
};
use async_trait::async_trait;
use futures::{channel::mpsc, stream::BoxStream, StreamExt};
use log::{debug, info};

use crate::error::SyncError;

/// Live logs in delivery order. The stream ends when the transport drops.
pub type LogStream = BoxStream<'static, Log>;

/// Per-subscription buffer inside the provider, before the forwarding task
/// picks items up.
const SUBSCRIPTION_CHANNEL_SIZE: usize = 1024;

#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, SyncError>;
}

/// One open streaming connection. Dropping it closes the transport.
#[async_trait]
pub trait StreamConnection: Send + Sync {
    async fn block_number(&self) -> Result<u64, SyncError>;

    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream, SyncError>;
}

/// Websocket transport that never reconnects on its own.
///
/// A dropped socket shuts the provider down, which ends every subscription
/// stream, so the supervisor sees the disconnect and backfills the gap.
#[derive(Clone)]
struct SingleSessionWs(WsConnect);

impl PubSubConnect for SingleSessionWs {
    fn is_local(&self) -> bool {
        self.0.is_local()
    }

    async fn connect(&self) -> TransportResult<ConnectionHandle> {
        self.0.connect().await
    }

    async fn try_reconnect(&self) -> TransportResult<ConnectionHandle> {
        debug!("Websocket dropped, leaving reconnect to the supervisor");
        Err(TransportErrorKind::backend_gone())
    }
}

pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn StreamConnection>, SyncError> {
        let connect = SingleSessionWs(WsConnect::new(self.url.clone()).with_max_retries(0));
        let provider = ProviderBuilder::new()
            .connect_pubsub_with(connect)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        if let Some(frontend) = provider.client().pubsub_frontend() {
            frontend.set_channel_size(SUBSCRIPTION_CHANNEL_SIZE);
        }

        info!("Websocket provider connected");

        Ok(Box::new(WsConnection {
            provider: DynProvider::new(provider),
        }))
    }
}

struct WsConnection {
    provider: DynProvider,
}

#[async_trait]
impl StreamConnection for WsConnection {
    async fn block_number(&self) -> Result<u64, SyncError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))
    }

    /// Subscribe and drain the provider's bounded channel into an unbounded
    /// one, so logs arriving while the caller is busy are kept in order.
    async fn subscribe_logs(&self, filter: &Filter) -> Result<LogStream, SyncError> {
        let subscription = self
            .provider
            .subscribe_logs(filter)
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded();
        let mut source = subscription.into_stream();
        tokio::spawn(async move {
            while let Some(log) = source.next().await {
                if tx.unbounded_send(log).is_err() {
                    break;
                }
            }
            debug!("Log subscription ended");
        });

        Ok(rx.boxed())
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted connector standing in for the websocket provider.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::channel::mpsc;

    use super::*;

    /// Handle the test keeps to drive one scripted connection.
    pub struct LiveFeed {
        tx: mpsc::UnboundedSender<Log>,
    }

    impl LiveFeed {
        pub fn push(&self, log: Log) {
            let _ = self.tx.unbounded_send(log);
        }

        /// Simulate a transport-level close.
        pub fn close(self) {
            self.tx.close_channel();
        }
    }

    pub enum Script {
        Refuse,
        Accept {
            head: u64,
            logs: Mutex<Option<mpsc::UnboundedReceiver<Log>>>,
        },
    }

    #[derive(Default)]
    pub struct FakeConnector {
        scripts: Mutex<VecDeque<Script>>,
        pub attempts: AtomicUsize,
        pub subscriptions: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn refuse(&self) {
            self.scripts.lock().unwrap().push_back(Script::Refuse);
        }

        /// Queue a connection that completes the handshake but refuses
        /// `eth_subscribe`.
        pub fn reject_subscription(&self) {
            self.scripts.lock().unwrap().push_back(Script::Accept {
                head: 0,
                logs: Mutex::new(None),
            });
        }

        /// Queue a connection reporting `head` and return its live feed.
        pub fn accept(&self, head: u64) -> LiveFeed {
            let (tx, rx) = mpsc::unbounded();
            self.scripts.lock().unwrap().push_back(Script::Accept {
                head,
                logs: Mutex::new(Some(rx)),
            });
            LiveFeed { tx }
        }
    }

    #[async_trait]
    impl StreamConnector for FakeConnector {
        async fn connect(&self) -> Result<Box<dyn StreamConnection>, SyncError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(Script::Accept { head, logs }) => Ok(Box::new(FakeConnection {
                    head,
                    logs,
                    subscriptions: self.subscriptions.clone(),
                })),
                Some(Script::Refuse) | None => {
                    Err(SyncError::Transport("connection refused".to_string()))
                },
            }
        }
    }

    struct FakeConnection {
        head: u64,
        logs: Mutex<Option<mpsc::UnboundedReceiver<Log>>>,
        subscriptions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StreamConnection for FakeConnection {
        async fn block_number(&self) -> Result<u64, SyncError> {
            Ok(self.head)
        }

        async fn subscribe_logs(&self, _filter: &Filter) -> Result<LogStream, SyncError> {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            let rx = self
                .logs
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| SyncError::Transport("subscription rejected".to_string()))?;
            Ok(rx.boxed())
        }
    }
}
