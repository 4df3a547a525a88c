//! Transport seam for the streaming supervisor
//!
//! The supervisor only talks to these traits, so a WebSocket connection and
//! an in-memory test double are interchangeable.

use crate::error::FeedError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One inbound event from an open connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text frame, handed to the dispatcher
    Text(String),
    /// Binary frame; the service never sends these
    Binary(Vec<u8>),
    /// Protocol-level ping/pong, answered by the transport itself
    Control,
    /// Peer closed the connection, with its close reason if one was given
    Closed(Option<String>),
    /// Read failure; the connection is unusable afterwards
    Error(String),
}

/// Outbound half of a connection
#[async_trait]
pub trait FrameWriter: Send {
    async fn send_text(&mut self, text: String) -> Result<(), FeedError>;

    /// Close the connection; closing twice is not an error
    async fn close(&mut self) -> Result<(), FeedError>;
}

/// Inbound half of a connection
#[async_trait]
pub trait FrameReader: Send {
    /// Next inbound event; `None` once the stream has ended
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

/// Opens connections to a streaming endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, FeedError>;
}

/// An open connection, split into its two halves
pub struct Connection {
    pub writer: Box<dyn FrameWriter>,
    pub reader: Box<dyn FrameReader>,
}

impl Connection {
    pub fn new(writer: impl FrameWriter + 'static, reader: impl FrameReader + 'static) -> Self {
        Self {
            writer: Box::new(writer),
            reader: Box::new(reader),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Writer shared between the supervisor and the heartbeat of one connection
pub type SharedWriter = Arc<Mutex<Box<dyn FrameWriter>>>;
