//! Transport seams for the realtime channels.
//!
//! Channels never touch sockets directly; they go through a
//! [`TransportProvider`], which lets the native stack (tokio-tungstenite and
//! reqwest) be swapped for scripted transports in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use livechat_shared::{kind_for_status, ErrorKind};
use url::Url;

mod native;
pub mod sse;

pub use native::{NativeTransports, FORCE_EVENT_STREAM_ENV};
pub use sse::{ServerSentEvent, SseParser};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("server rejected the connection with HTTP {status}")]
    Rejected { status: u16 },
    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection lost: {0}")]
    Io(String),
}

impl TransportError {
    /// HTTP status behind the failure, or `0` when there was no response.
    pub fn status(&self) -> u16 {
        match self {
            TransportError::Rejected { status } => *status,
            _ => 0,
        }
    }

    /// Error kind shown to the user for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Rejected { status } => kind_for_status(*status),
            TransportError::Timeout(_) => ErrorKind::Timeout,
            TransportError::Connect(_) | TransportError::Io(_) => ErrorKind::Network,
        }
    }
}

/// An open bidirectional text socket.
#[async_trait]
pub trait SocketConnection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame, or `None` once the peer has closed the connection.
    /// Must be cancel-safe.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// An open server-push stream.
#[async_trait]
pub trait EventStream: Send {
    /// Next complete event, or `None` once the server ended the stream.
    async fn next_event(&mut self) -> Option<Result<ServerSentEvent, TransportError>>;
}

#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// Whether the bidirectional transport can be used right now. Asked on
    /// every channel selection, never cached.
    fn websocket_available(&self) -> bool;

    async fn open_socket(&self, url: &Url) -> Result<Box<dyn SocketConnection>, TransportError>;

    async fn open_event_stream(&self, url: &Url) -> Result<Box<dyn EventStream>, TransportError>;
}

pub type SharedTransports = Arc<dyn TransportProvider>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_kinds() {
        assert_eq!(TransportError::Connect("refused".into()).kind(), ErrorKind::Network);
        assert_eq!(TransportError::Io("reset".into()).kind(), ErrorKind::Network);
        assert_eq!(
            TransportError::Timeout(Duration::from_secs(10)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(TransportError::Rejected { status: 401 }.kind(), ErrorKind::Auth);
        assert_eq!(TransportError::Rejected { status: 429 }.kind(), ErrorKind::RateLimit);
        assert_eq!(TransportError::Rejected { status: 503 }.status(), 503);
    }
}
