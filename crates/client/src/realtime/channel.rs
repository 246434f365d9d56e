//! Realtime channel lifecycle shared by both transport variants.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use livechat_shared::{ConnectionStatus, InboundEvent, SessionId};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

use super::reconnect::ReconnectPolicy;
use super::{event_stream, socket};
use crate::config::WidgetConfig;
use crate::transport::{SharedTransports, TransportError};

/// Which wire protocol a channel speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Bidirectional socket with client heartbeat.
    WebSocket,
    /// Server-push fallback.
    EventStream,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::WebSocket => f.write_str("websocket"),
            ChannelKind::EventStream => f.write_str("event_stream"),
        }
    }
}

/// Callbacks a channel reports through. Invoked from the channel's driver
/// task, never after the channel is closed.
#[derive(Clone)]
pub struct ChannelCallbacks {
    pub on_event: Arc<dyn Fn(InboundEvent) + Send + Sync>,
    pub on_status: Arc<dyn Fn(ConnectionStatus) + Send + Sync>,
    /// Called once, when the reconnect budget is exhausted.
    pub on_error: Arc<dyn Fn(TransportError) + Send + Sync>,
}

impl ChannelCallbacks {
    pub fn new(
        on_event: impl Fn(InboundEvent) + Send + Sync + 'static,
        on_status: impl Fn(ConnectionStatus) + Send + Sync + 'static,
        on_error: impl Fn(TransportError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_event: Arc::new(on_event),
            on_status: Arc::new(on_status),
            on_error: Arc::new(on_error),
        }
    }
}

/// State shared between a channel handle and its driver task.
pub(crate) struct DriverContext {
    pub(crate) session: SessionId,
    pub(crate) url: Url,
    pub(crate) transports: SharedTransports,
    pub(crate) heartbeat_interval: Duration,
    callbacks: ChannelCallbacks,
    closed: Arc<AtomicBool>,
}

impl DriverContext {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        if !self.is_closed() {
            (self.callbacks.on_status)(status);
        }
    }

    pub(crate) fn emit(&self, event: InboundEvent) {
        if event.kind.is_probe() || self.is_closed() {
            return;
        }
        (self.callbacks.on_event)(event);
    }

    /// Runs after every failed open or dropped connection. Returns `false`
    /// when the driver should stop.
    pub(crate) async fn wait_before_retry(
        &self,
        policy: &mut ReconnectPolicy,
        failure: Option<TransportError>,
    ) -> bool {
        if self.is_closed() {
            return false;
        }
        self.set_status(ConnectionStatus::Disconnected);

        match policy.next_delay() {
            Some(delay) => {
                tracing::info!(
                    session = %self.session,
                    attempt = policy.attempts(),
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "scheduling reconnect"
                );
                tokio::time::sleep(delay).await;
                !self.is_closed()
            }
            None => {
                let failure = failure
                    .unwrap_or_else(|| TransportError::Io("connection closed by server".to_string()));
                tracing::warn!(
                    session = %self.session,
                    attempts = policy.attempts(),
                    error = %failure,
                    "reconnect attempts exhausted"
                );
                self.set_status(ConnectionStatus::Error);
                if !self.is_closed() {
                    (self.callbacks.on_error)(failure);
                }
                false
            }
        }
    }
}

/// A live realtime channel for one session.
///
/// The driver task owns the heartbeat and reconnect timers, so closing the
/// channel (or dropping it) cancels both.
pub struct RealtimeChannel {
    kind: ChannelKind,
    session: SessionId,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl RealtimeChannel {
    /// Spawn the channel's driver. Must be called inside a tokio runtime.
    ///
    /// The driver does not open its transport until it holds a permit from
    /// `slot`; a coordinator hands every channel the same single-permit
    /// semaphore so two channels can never be connected at once.
    pub fn open(
        kind: ChannelKind,
        session: SessionId,
        config: &WidgetConfig,
        transports: SharedTransports,
        callbacks: ChannelCallbacks,
        slot: Arc<Semaphore>,
    ) -> Self {
        let url = match kind {
            ChannelKind::WebSocket => config.websocket_url(&session),
            ChannelKind::EventStream => config.event_stream_url(&session),
        };
        let closed = Arc::new(AtomicBool::new(false));
        let ctx = Arc::new(DriverContext {
            session: session.clone(),
            url,
            transports,
            heartbeat_interval: config.heartbeat_interval,
            callbacks,
            closed: closed.clone(),
        });
        let policy = ReconnectPolicy::from_config(config);

        let task = tokio::spawn(async move {
            let Ok(_permit) = slot.acquire_owned().await else {
                return;
            };
            match kind {
                ChannelKind::WebSocket => socket::run(ctx, policy).await,
                ChannelKind::EventStream => event_stream::run(ctx, policy).await,
            }
        });

        Self {
            kind,
            session,
            closed,
            task: Some(task),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the channel. Idempotent; no callback fires afterwards and no
    /// queued reconnect runs.
    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::debug!(session = %self.session, transport = %self.kind, "realtime channel closed");
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("kind", &self.kind)
            .field("session", &self.session)
            .field("closed", &self.is_closed())
            .finish()
    }
}
