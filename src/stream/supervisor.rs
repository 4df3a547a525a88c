//! Connection Supervisor
//!
//! A single actor task owns the connection, its state and the generation
//! counter. It connects, subscribes, starts the heartbeat, dispatches inbound
//! frames and reconnects after a fixed delay whenever the connection is lost.
//!
//! ## State machine
//! ```text
//! Disconnected -> Connecting -> Connected -> Closing -> Disconnected -> ...
//!                     |                                      ^
//!                     +------------ connect failed ----------+
//! ```

use super::dispatcher::{Dispatcher, TickSink};
use super::heartbeat::{Heartbeat, HeartbeatFailed};
use super::transport::{Connection, Connector, FrameReader, SharedWriter, TransportEvent};
use super::types::{ConnectionState, ConnectionStatus, Subscription};
use crate::config::StreamConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on the close handshake during teardown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle timer deadline used when idle detection is disabled
const NEVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Builds and starts the streaming actor
pub struct Supervisor {
    connector: Box<dyn Connector>,
    config: StreamConfig,
    subscription: Subscription,
    dispatcher: Dispatcher,
}

impl Supervisor {
    pub fn new(
        connector: impl Connector + 'static,
        config: StreamConfig,
        subscription: Subscription,
        sink: Arc<dyn TickSink>,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            config,
            subscription,
            dispatcher: Dispatcher::new(sink),
        }
    }

    /// Spawn the actor on the current tokio runtime
    pub fn start(self) -> SupervisorHandle {
        let shutdown = CancellationToken::new();
        let done = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            connector: self.connector,
            config: self.config,
            subscription: self.subscription,
            dispatcher: self.dispatcher,
            shutdown: shutdown.clone(),
            done: done.clone(),
            status: status_tx,
            generation: 0,
            live: Arc::new(AtomicU64::new(0)),
            events_tx,
            events_rx,
        };

        let task = tokio::spawn(actor.run());

        SupervisorHandle {
            shutdown,
            done,
            status: status_rx,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Control handle for a running supervisor
///
/// Dropping the handle cancels the actor without waiting for it.
pub struct SupervisorHandle {
    shutdown: CancellationToken,
    /// Cancelled by the actor on exit
    done: CancellationToken,
    status: watch::Receiver<ConnectionStatus>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SupervisorHandle {
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// Generation of the most recent connection, 0 before the first one
    pub fn generation(&self) -> u64 {
        self.status.borrow().generation
    }

    /// Receiver notified on every state transition
    pub fn status_changes(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// True once the actor has exited, either stopped or out of reconnect attempts
    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Wait for the actor to exit on its own
    pub async fn wait(&self) {
        self.join().await;
    }

    /// Stop the supervisor and wait for the connection and heartbeat to be torn down
    ///
    /// Safe to call more than once and from several tasks at once. No call
    /// returns before the teardown has completed.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        self.join().await;
    }

    /// Holds the task lock until the join completes
    async fn join(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.as_mut() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Supervisor task failed");
            }
            task.take();
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Why a served connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Stopped,
    Lost,
}

struct Actor {
    connector: Box<dyn Connector>,
    config: StreamConfig,
    subscription: Subscription,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    done: CancellationToken,
    status: watch::Sender<ConnectionStatus>,
    generation: u64,
    live: Arc<AtomicU64>,
    events_tx: mpsc::UnboundedSender<HeartbeatFailed>,
    events_rx: mpsc::UnboundedReceiver<HeartbeatFailed>,
}

impl Actor {
    async fn run(mut self) {
        let _done = self.done.clone().drop_guard();
        let mut failures: u32 = 0;

        tracing::info!(
            url = %self.config.url,
            subscription = %self.subscription,
            "Supervisor started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.transition(ConnectionState::Connecting);

            let attempt = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = tokio::time::timeout(
                    self.config.connect_timeout,
                    self.connector.connect(&self.config.url),
                ) => result,
            };

            match attempt {
                Ok(Ok(connection)) => {
                    failures = 0;
                    if self.serve(connection).await == Exit::Stopped {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        url = %self.config.url,
                        attempt = failures,
                        error = %e,
                        "Connection attempt failed"
                    );
                    self.transition(ConnectionState::Disconnected);
                }
                Err(_) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        url = %self.config.url,
                        attempt = failures,
                        timeout = ?self.config.connect_timeout,
                        "Connection attempt timed out"
                    );
                    self.transition(ConnectionState::Disconnected);
                }
            }

            if self.config.reconnect.exhausted(failures) {
                tracing::error!(
                    attempts = failures,
                    "Giving up after repeated connection failures"
                );
                break;
            }

            tracing::info!(delay = ?self.config.reconnect.delay, "Reconnecting after delay");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect.delay) => {}
            }
        }

        self.transition(ConnectionState::Disconnected);
        tracing::info!(generation = self.generation, "Supervisor stopped");
    }

    /// Drive one connection until it is lost or the supervisor is stopped, then tear it down
    async fn serve(&mut self, connection: Connection) -> Exit {
        self.generation += 1;
        let generation = self.generation;

        let Connection { writer, mut reader } = connection;
        let writer: SharedWriter = Arc::new(Mutex::new(writer));

        self.transition(ConnectionState::Connected);
        tracing::info!(url = %self.config.url, generation, "Connected");

        let frame = self.subscription.frame().to_string();
        let subscribed = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            result = async { writer.lock().await.send_text(frame).await } => Some(result),
        };

        match subscribed {
            None => {
                self.teardown(generation, &writer, None).await;
                return Exit::Stopped;
            }
            Some(Err(e)) => {
                tracing::warn!(generation, error = %e, "Subscribe failed");
                self.teardown(generation, &writer, None).await;
                return Exit::Lost;
            }
            Some(Ok(())) => {
                tracing::info!(generation, key = %self.subscription, "Subscribed");
            }
        }

        self.live.store(generation, Ordering::SeqCst);
        let heartbeat_stop = self.shutdown.child_token();
        let heartbeat = Heartbeat::new(
            generation,
            self.config.heartbeat_interval,
            writer.clone(),
            self.live.clone(),
            self.events_tx.clone(),
        )
        .spawn(heartbeat_stop.clone());

        let exit = self.read_loop(generation, &mut *reader).await;

        self.teardown(generation, &writer, Some((heartbeat_stop, heartbeat)))
            .await;
        exit
    }

    async fn read_loop(&mut self, generation: u64, reader: &mut dyn FrameReader) -> Exit {
        let idle_timeout = self.config.read_idle_timeout;
        let idle = tokio::time::sleep(idle_timeout.unwrap_or(NEVER));
        tokio::pin!(idle);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Exit::Stopped,
                Some(failed) = self.events_rx.recv() => {
                    if failed.generation == generation {
                        tracing::warn!(generation, error = %failed.error, "Heartbeat failed, closing connection");
                        return Exit::Lost;
                    }
                    tracing::debug!(generation = failed.generation, "Ignoring heartbeat failure from stale connection");
                }
                event = reader.next_event() => {
                    if let Some(timeout) = idle_timeout {
                        idle.as_mut().reset(Instant::now() + timeout);
                    }
                    match event {
                        Some(TransportEvent::Text(text)) => self.handle_text(generation, &text),
                        Some(TransportEvent::Binary(data)) => {
                            tracing::debug!(generation, bytes = data.len(), "Ignoring binary frame");
                        }
                        Some(TransportEvent::Control) => {}
                        Some(TransportEvent::Closed(reason)) => {
                            tracing::info!(generation, reason = ?reason, "Connection closed by peer");
                            return Exit::Lost;
                        }
                        Some(TransportEvent::Error(error)) => {
                            tracing::warn!(generation, error = %error, "Connection error");
                            return Exit::Lost;
                        }
                        None => {
                            tracing::info!(generation, "Connection stream ended");
                            return Exit::Lost;
                        }
                    }
                }
                _ = &mut idle, if idle_timeout.is_some() => {
                    tracing::warn!(generation, timeout = ?idle_timeout, "No data received, closing idle connection");
                    return Exit::Lost;
                }
            }
        }
    }

    fn handle_text(&self, generation: u64, text: &str) {
        match self.dispatcher.dispatch(text) {
            Ok(Some(tick)) => {
                tracing::trace!(generation, symbol = %tick.symbol, price = tick.price, "Tick dispatched");
            }
            Ok(None) => {
                tracing::trace!(generation, "Frame without body");
            }
            Err(e) => {
                tracing::warn!(
                    generation,
                    error = %e,
                    error_type = e.error_type(),
                    "Dropping undecodable frame"
                );
            }
        }
    }

    async fn teardown(
        &mut self,
        generation: u64,
        writer: &SharedWriter,
        heartbeat: Option<(CancellationToken, JoinHandle<()>)>,
    ) {
        self.transition(ConnectionState::Closing);
        self.live.store(0, Ordering::SeqCst);

        if let Some((stop, handle)) = heartbeat {
            stop.cancel();
            if let Err(e) = handle.await {
                tracing::error!(generation, error = %e, "Heartbeat task failed");
            }
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, async { writer.lock().await.close().await }).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(generation, error = %e, "Close failed"),
            Err(_) => tracing::debug!(generation, "Close timed out"),
        }

        self.transition(ConnectionState::Disconnected);
        tracing::info!(generation, "Disconnected");
    }

    fn transition(&self, state: ConnectionState) {
        let previous = self.status.send_replace(ConnectionStatus {
            state,
            generation: self.generation,
        });
        if previous.state != state {
            tracing::debug!(from = %previous.state, to = %state, generation = self.generation, "State transition");
        }
    }
}
