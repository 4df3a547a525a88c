// Scripted in-memory transport shared by the streaming tests

#![allow(dead_code)]

use async_trait::async_trait;
use market_feed::config::{ReconnectPolicy, StreamConfig};
use market_feed::stream::{
    Connection, Connector, FrameReader, FrameWriter, PingFrame, TransportEvent,
};
use market_feed::FeedError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SUBSCRIBE: &str = r#"{"Key":"btcusdt"}"#;

/// What the next connection attempt does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Accept,
    Refuse,
}

/// Connector that follows a script, then accepts every further attempt
#[derive(Clone)]
pub struct FakeConnector {
    script: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<AtomicUsize>,
    peers: mpsc::UnboundedSender<FakePeer>,
}

impl FakeConnector {
    pub fn new(script: &[Step]) -> (Self, mpsc::UnboundedReceiver<FakePeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            attempts: Arc::new(AtomicUsize::new(0)),
            peers,
        };
        (connector, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Connection, FeedError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Accept);

        if step == Step::Refuse {
            return Err(FeedError::transport("connection refused"));
        }

        let (inbound, rx) = mpsc::unbounded_channel();
        let peer = FakePeer {
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_sends: Arc::new(AtomicBool::new(false)),
            inbound,
        };
        let writer = FakeWriter {
            sent: peer.sent.clone(),
            closed: peer.closed.clone(),
            fail_sends: peer.fail_sends.clone(),
        };
        let _ = self.peers.send(peer);

        Ok(Connection::new(writer, FakeReader { inbound: rx }))
    }
}

/// Test-side view of one accepted connection
///
/// The connection stays open while the peer is alive; dropping it ends the stream.
pub struct FakePeer {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl FakePeer {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subscribes(&self) -> usize {
        self.sent().iter().filter(|f| f.as_str() == SUBSCRIBE).count()
    }

    pub fn pings(&self) -> Vec<i64> {
        self.sent()
            .iter()
            .filter_map(|f| serde_json::from_str::<PingFrame>(f).ok())
            .map(|p| p.ping)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn push_text(&self, text: &str) {
        let _ = self.inbound.send(TransportEvent::Text(text.to_string()));
    }

    pub fn push(&self, event: TransportEvent) {
        let _ = self.inbound.send(event);
    }
}

struct FakeWriter {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
}

#[async_trait]
impl FrameWriter for FakeWriter {
    async fn send_text(&mut self, text: String) -> Result<(), FeedError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FeedError::transport("send on closed connection"));
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(FeedError::transport("broken pipe"));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FeedError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeReader {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl FrameReader for FakeReader {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.inbound.recv().await
    }
}

/// 5 s reconnect delay, 10 s heartbeat, idle detection off
pub fn config() -> StreamConfig {
    StreamConfig {
        url: "ws://fake/ws".to_string(),
        reconnect: ReconnectPolicy {
            delay: Duration::from_secs(5),
            max_attempts: None,
        },
        heartbeat_interval: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(10),
        read_idle_timeout: None,
    }
}

/// Let every runnable task settle; only advances paused time by 1 ms
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
