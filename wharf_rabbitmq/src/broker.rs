use crate::{BrokerConfig, Handle};
use lapin::{Channel, Connection, ConnectionProperties};
use secure_string::SecureString;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;
use thiserror::Error;
use tokio::select;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use wharf_core::{AppContext, AppSpindown, AppSpindownToken};
use wharf_sync::{Signal, Watcher};
use wharf_util::{Backoff, BackoffConfig};
use tracing::{info, warn};

/// A supervised connection to a RabbitMQ cluster.
///
/// A [`Broker`] owns at most one live [`Connection`](lapin::Connection) at a
/// time. It dials eagerly on [construction](Broker::connect); once connected,
/// it runs a background supervisor task that redials on disconnect, honoring
/// a fixed reconnect interval, and fans out a notification to every
/// registered [`Watcher`] once the connection is reestablished.
///
/// Unlike the connection-retrieval gateway this was grown from, a [`Broker`]
/// never makes a caller wait for reconnection: [`is_connected`](Broker::is_connected)
/// is a synchronous, non-blocking check, and [`open_channel`](Broker::open_channel)
/// fails immediately with [`BrokerError::NotConnected`] rather than suspending
/// until the connection comes back. Callers that want to wait should
/// subscribe to [`notify_reestablish`](Broker::notify_reestablish).
///
/// Integrated with [`AppSpindown`]: once the global [`AppContext`] terminates,
/// the supervisor stops reconnecting and closes the current connection.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    identifier: Arc<str>,
    dsn: SecureString,
    dial_timeout: Duration,
    state: AtomicU8,
    connection: AsyncMutex<Option<Connection>>,
    backoff: Backoff,
    close_signal: Signal<Arc<str>>,
    reestablish_signal: Signal<bool>,
    _spindown_token: AppSpindownToken,
}

const STATE_CONNECTED: u8 = 0;
const STATE_DISCONNECTED: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// The error surfaced by [`Broker`] operations.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The broker currently has no live connection. Raised synchronously
    /// instead of suspending the caller until reconnection.
    #[error("broker is not connected to RabbitMQ")]
    NotConnected,

    /// Dialing RabbitMQ did not complete within the configured dial timeout.
    #[error("timed out dialing RabbitMQ")]
    DialTimeout,

    /// Dialing RabbitMQ failed outright.
    #[error("failed to dial RabbitMQ: {0}")]
    Dial(#[source] lapin::Error),

    /// A channel could not be created on the current connection.
    #[error("failed to create a RabbitMQ channel: {0}")]
    Channel(#[source] lapin::Error),
}

impl Broker {
    /// Dials the RabbitMQ cluster described by the given [`BrokerConfig`] and,
    /// on success, spawns the background supervisor task and returns a
    /// cheaply clone-able [`Broker`] handle.
    ///
    /// Returns an error synchronously if the initial dial fails or exceeds
    /// the configured dial timeout; there is no initial retry.
    pub async fn connect(config: impl AsRef<BrokerConfig>) -> Result<Self, BrokerError> {
        let config = config.as_ref();
        let handle = config.handle();

        let name = Self::compose_name(handle);
        let identifier = Arc::from(handle.identifier());
        let dsn = handle.dsn().clone();
        let dial_timeout = config.dial_timeout();
        let backoff = Backoff::new(&BackoffConfig::constant(config.reconnect_interval()));

        let (connection, close_rx) = Self::dial(&name, &identifier, &dsn, dial_timeout).await?;

        let inner = Arc::new(Inner {
            name,
            identifier,
            dsn,
            dial_timeout,
            state: AtomicU8::new(STATE_CONNECTED),
            connection: AsyncMutex::new(Some(connection)),
            backoff,
            close_signal: Signal::new(),
            reestablish_signal: Signal::new(),
            _spindown_token: AppSpindown::register(format!("{}-supervisor", handle.name())),
        });

        let broker = Self { inner };

        tokio::spawn(broker.clone().supervise(close_rx));

        Ok(broker)
    }

    fn compose_name(handle: &Handle) -> Arc<str> {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        Arc::from(format!(
            "rabbitmq:broker:{}:{}",
            handle.name(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        ))
    }

    /// Reports whether the broker currently holds a live connection.
    ///
    /// A `true` observation does not guarantee that a subsequent publish will
    /// succeed (the connection may drop concurrently), only that one may be
    /// attempted.
    pub fn is_connected(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == STATE_CONNECTED
    }

    fn is_closed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == STATE_CLOSED
    }

    /// Registers a new subscriber that receives one notification every time
    /// the underlying connection is lost. The notification is the error
    /// message of the underlying I/O failure.
    ///
    /// Multiple subscribers may be registered; each receives its own copy
    /// without blocking the others.
    pub fn notify_connection_close(&self) -> Watcher<Arc<str>> {
        self.inner.close_signal.watch()
    }

    /// Registers a new subscriber that receives a single `true` notification
    /// every time the connection is reestablished after having been lost.
    ///
    /// Multiple subscribers may be registered; each receives its own copy
    /// without blocking the others. A subscriber that cannot keep up simply
    /// keeps the oldest unread notification instead of queuing newer ones.
    pub fn notify_reestablish(&self) -> Watcher<bool> {
        self.inner.reestablish_signal.watch()
    }

    /// Suspends the caller until the current connection is lost (or the
    /// broker is closed).
    pub async fn wait_until_connection_closes(&self) {
        let mut watcher = self.notify_connection_close();
        watcher.next().await;
    }

    /// Creates a new AMQP channel on the current connection.
    ///
    /// Returns [`BrokerError::NotConnected`] immediately, without suspending,
    /// if the broker has no live connection right now.
    pub async fn open_channel(&self) -> Result<Channel, BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }

        let guard = self.inner.connection.lock().await;

        match guard.as_ref() {
            Some(connection) => connection
                .create_channel()
                .await
                .map_err(BrokerError::Channel),
            None => Err(BrokerError::NotConnected),
        }
    }

    /// Permanently closes the broker: closes the current connection and
    /// enters the terminal *Closed* state, after which no further reconnect
    /// attempts are made.
    pub async fn close(&self) {
        self.inner.state.store(STATE_CLOSED, Ordering::Release);

        let mut guard = self.inner.connection.lock().await;
        if let Some(connection) = guard.take() {
            let result = connection.close(0, "Broker closed").await;
            if let Err(error) = result {
                warn!(
                    name = self.inner.name.as_ref(),
                    identifier = self.inner.identifier.as_ref(),
                    ?error,
                    error_message = %error,
                    "Failed to cleanly close the RabbitMQ connection",
                );
            }
        }

        self.inner
            .close_signal
            .notify(Arc::from("broker closed"));
    }
}

impl Broker {
    /// Dials a fresh connection and registers an error hook that fires the
    /// returned receiver exactly once, when the connection's I/O loop
    /// observes a failure.
    async fn dial(
        name: &str,
        identifier: &str,
        dsn: &SecureString,
        dial_timeout: Duration,
    ) -> Result<(Connection, oneshot::Receiver<String>), BrokerError> {
        let connection_properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current())
            .with_reactor(tokio_reactor_trait::Tokio);

        let dial = Connection::connect(dsn.unsecure(), connection_properties);

        let connection = match tokio::time::timeout(dial_timeout, dial).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(error)) => {
                warn!(name, identifier, ?error, error_message = %error, "Failed to dial RabbitMQ");
                return Err(BrokerError::Dial(error));
            }
            Err(_) => {
                warn!(name, identifier, "Timed out dialing RabbitMQ");
                return Err(BrokerError::DialTimeout);
            }
        };

        let (tx, rx) = oneshot::channel();
        let tx = SyncMutex::new(Some(tx));

        connection.on_error(move |error| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(error.to_string());
            }
        });

        Ok((connection, rx))
    }

    /// Long-running supervisor task: waits for the current connection to
    /// close, then redials on a fixed interval until it succeeds or the
    /// broker is closed.
    async fn supervise(self, mut close_rx: oneshot::Receiver<String>) {
        loop {
            select! {
                biased;
                _ = AppContext::terminated() => break,
                result = &mut close_rx => {
                    let message = result.unwrap_or_else(|_| "connection lost".to_string());
                    if self.is_closed() {
                        break;
                    }

                    info!(
                        name = self.inner.name.as_ref(),
                        identifier = self.inner.identifier.as_ref(),
                        message,
                        "Lost the RabbitMQ connection, will attempt to reconnect",
                    );

                    self.inner.state.store(STATE_DISCONNECTED, Ordering::Release);
                    self.inner.connection.lock().await.take();
                    self.inner.close_signal.notify(Arc::from(message.as_str()));

                    match self.reconnect().await {
                        Some(new_close_rx) => close_rx = new_close_rx,
                        None => break, // closed while reconnecting
                    }
                }
            }
        }

        info!(
            name = self.inner.name.as_ref(),
            identifier = self.inner.identifier.as_ref(),
            "RabbitMQ broker supervisor stopped",
        );
    }

    /// Redials forever, honoring the reconnect interval, until either a new
    /// connection is established or the broker is closed in the meantime.
    async fn reconnect(&self) -> Option<oneshot::Receiver<String>> {
        loop {
            if self.is_closed() {
                return None;
            }

            select! {
                biased;
                _ = AppContext::terminated() => return None,
                _ = self.inner.backoff.sleep_next() => {}
            }

            if self.is_closed() {
                return None;
            }

            match Self::dial(
                &self.inner.name,
                &self.inner.identifier,
                &self.inner.dsn,
                self.inner.dial_timeout,
            )
            .await
            {
                Ok((connection, close_rx)) => {
                    *self.inner.connection.lock().await = Some(connection);
                    self.inner.backoff.reset();
                    self.inner.state.store(STATE_CONNECTED, Ordering::Release);
                    self.inner.reestablish_signal.notify(true);

                    info!(
                        name = self.inner.name.as_ref(),
                        identifier = self.inner.identifier.as_ref(),
                        "Reestablished the RabbitMQ connection",
                    );

                    return Some(close_rx);
                }
                Err(_) => continue, // already logged by `dial`
            }
        }
    }
}
