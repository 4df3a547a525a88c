use thiserror::Error;

/// Boxed error cause carried by transport and decode failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type shared by the query client and the streaming subsystem
#[derive(Error, Debug)]
pub enum FeedError {
    /// Caller input (or a configuration value) was rejected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connect, send or timeout failure
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Non-success HTTP status or an error code embedded in the response envelope
    #[error("Remote error (status {status}): {message}")]
    Remote { status: i64, message: String },

    /// Payload could not be decompressed or decoded
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl FeedError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        FeedError::InvalidArgument(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        FeedError::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        FeedError::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        FeedError::Decode {
            message: message.into(),
            source: None,
        }
    }

    pub fn decode_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        FeedError::Decode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// True for transport failures only
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Transport { .. })
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            FeedError::InvalidArgument(_) => "invalid_argument",
            FeedError::Transport { .. } => "transport_error",
            FeedError::Remote { .. } => "remote_error",
            FeedError::Decode { .. } => "decode_error",
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return FeedError::Remote {
                status: i64::from(status.as_u16()),
                message: format!("HTTP {}", status),
            };
        }

        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Failed to connect to market data service".to_string()
        } else if err.is_decode() || err.is_body() {
            return FeedError::decode_with("Failed to read response body", err);
        } else {
            "HTTP request failed".to_string()
        };

        FeedError::transport_with(message, err)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::decode_with(format!("JSON parsing failed: {}", err), err)
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::transport_with(format!("I/O failure: {}", err), err)
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::transport_with(format!("WebSocket failure: {}", err), err)
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
