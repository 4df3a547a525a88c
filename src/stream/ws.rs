//! WebSocket transport
//!
//! `tokio-tungstenite` implementation of the transport seam. Protocol pings
//! from the server are answered by tungstenite while the reader is polled.

use super::transport::{Connection, Connector, FrameReader, FrameWriter, TransportEvent};
use crate::error::FeedError;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects with `tokio_tungstenite::connect_async`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Connection, FeedError> {
        tracing::debug!(url = %url, "Opening WebSocket connection");

        let (ws_stream, response) = connect_async(url).await.map_err(|e| {
            FeedError::transport_with(format!("WebSocket connect to {} failed: {}", url, e), e)
        })?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (write, read) = ws_stream.split();
        Ok(Connection::new(
            WsWriter { sink: write, closed: false },
            WsReader { stream: read },
        ))
    }
}

struct WsWriter {
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl FrameWriter for WsWriter {
    async fn send_text(&mut self, text: String) -> Result<(), FeedError> {
        if self.closed {
            return Err(FeedError::transport("WebSocket writer already closed"));
        }
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FeedError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.close().await?;
        Ok(())
    }
}

struct WsReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl FrameReader for WsReader {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        let event = match self.stream.next().await? {
            Ok(Message::Text(text)) => TransportEvent::Text(text.as_str().to_owned()),
            Ok(Message::Binary(data)) => TransportEvent::Binary(data.to_vec()),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => TransportEvent::Control,
            Ok(Message::Close(frame)) => {
                TransportEvent::Closed(frame.map(|f| f.reason.as_str().to_owned()))
            }
            Ok(Message::Frame(_)) => TransportEvent::Control,
            Err(e) => TransportEvent::Error(e.to_string()),
        };
        Some(event)
    }
}
