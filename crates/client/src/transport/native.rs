//! Native transports: tokio-tungstenite for the socket, reqwest for the
//! server-push stream.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{EventStream, ServerSentEvent, SocketConnection, SseParser, TransportError, TransportProvider};
use crate::config::WidgetConfig;

/// Setting this variable (to anything) makes the native provider report the
/// socket transport as unavailable, forcing the server-push fallback.
pub const FORCE_EVENT_STREAM_ENV: &str = "LIVECHAT_FORCE_EVENT_STREAM";

#[derive(Debug, Clone)]
pub struct NativeTransports {
    http: reqwest::Client,
    connect_timeout: Duration,
}

impl NativeTransports {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.connect_timeout)
    }
}

impl Default for NativeTransports {
    fn default() -> Self {
        Self::from_config(&WidgetConfig::default())
    }
}

#[async_trait]
impl TransportProvider for NativeTransports {
    fn websocket_available(&self) -> bool {
        std::env::var_os(FORCE_EVENT_STREAM_ENV).is_none()
    }

    async fn open_socket(&self, url: &Url) -> Result<Box<dyn SocketConnection>, TransportError> {
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(map_ws_error)?;
        Ok(Box::new(TungsteniteSocket { stream }))
    }

    async fn open_event_stream(&self, url: &Url) -> Result<Box<dyn EventStream>, TransportError> {
        let request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send();
        let response = tokio::time::timeout(self.connect_timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| TransportError::Io(e.to_string()))
            })
            .boxed();

        Ok(Box::new(HttpEventStream {
            body,
            parser: SseParser::new(),
            ready: VecDeque::new(),
        }))
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match &err {
        tungstenite::Error::Http(response) => TransportError::Rejected {
            status: response.status().as_u16(),
        },
        _ => TransportError::Connect(err.to_string()),
    }
}

struct TungsteniteSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketConnection for TungsteniteSocket {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "server sent close frame");
                    return None;
                }
                // Protocol-level ping/pong is answered by tungstenite itself.
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }
}

struct HttpEventStream {
    body: BoxStream<'static, Result<Vec<u8>, TransportError>>,
    parser: SseParser,
    ready: VecDeque<ServerSentEvent>,
}

#[async_trait]
impl EventStream for HttpEventStream {
    async fn next_event(&mut self) -> Option<Result<ServerSentEvent, TransportError>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            match self.body.next().await? {
                Ok(chunk) => match self.parser.feed(&chunk) {
                    Ok(events) => self.ready.extend(events),
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
