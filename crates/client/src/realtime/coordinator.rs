//! Decides when a realtime channel exists and routes what it delivers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use livechat_shared::{
    ChatMessage, ConnectionStatus, ErrorContext, InboundEvent, InboundEventKind, Sender, SessionId,
    WidgetError,
};
use tokio::sync::{broadcast, watch, Semaphore};
use uuid::Uuid;

use super::channel::{ChannelCallbacks, ChannelKind, RealtimeChannel};
use crate::actions::WidgetAction;
use crate::config::WidgetConfig;
use crate::error_queue::ErrorQueue;
use crate::messages::MessageLog;
use crate::transport::{SharedTransports, TransportError};

const INCOMING_CAPACITY: usize = 64;

/// Application state fed by the realtime layer. Cloning shares it.
#[derive(Debug, Clone)]
pub struct LiveChatState {
    status: Arc<watch::Sender<ConnectionStatus>>,
    messages: Arc<Mutex<MessageLog>>,
    incoming: broadcast::Sender<ChatMessage>,
    errors: ErrorQueue,
}

impl LiveChatState {
    pub fn new(errors: ErrorQueue) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (incoming, _) = broadcast::channel(INCOMING_CAPACITY);
        Self {
            status: Arc::new(status),
            messages: Arc::new(Mutex::new(MessageLog::new())),
            incoming,
            errors,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::debug!(from = %previous, to = %status, "connection status changed");
        }
    }

    pub fn messages(&self) -> MutexGuard<'_, MessageLog> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Messages added after subscribing, from either the channel or the API.
    pub fn subscribe_messages(&self) -> broadcast::Receiver<ChatMessage> {
        self.incoming.subscribe()
    }

    pub fn errors(&self) -> &ErrorQueue {
        &self.errors
    }

    /// Add a message to the log and notify subscribers if it was new.
    pub fn push_message(&self, message: ChatMessage) -> bool {
        let added = self.messages().add_message(message.clone());
        if added {
            let _ = self.incoming.send(message);
        }
        added
    }

    fn handle_event(&self, session: &SessionId, event: InboundEvent) {
        match event.kind {
            InboundEventKind::MerchantMessage => {
                let Some(payload) = event.merchant_message() else {
                    tracing::warn!(session = %session, data = %event.data, "merchant message without text");
                    return;
                };
                self.push_message(ChatMessage {
                    id: format!("merchant-{}", Uuid::new_v4()),
                    sender: Sender::Merchant,
                    text: payload.message,
                    created_at: payload.created_at.unwrap_or_else(Utc::now),
                });
            }
            InboundEventKind::Connected => {
                tracing::info!(session = %session, "server acknowledged realtime session");
            }
            InboundEventKind::Ping | InboundEventKind::Pong => {}
        }
    }

    fn handle_failure(&self, session: &SessionId, err: TransportError) {
        tracing::error!(session = %session, error = %err, "realtime channel gave up");
        let context = ErrorContext::new().with_retry_action(WidgetAction::Reconnect.label());
        self.errors
            .add(WidgetError::new(err.kind(), u32::from(err.status()), context));
    }

    fn callbacks(&self, session: SessionId) -> ChannelCallbacks {
        let on_event = {
            let state = self.clone();
            let session = session.clone();
            move |event| state.handle_event(&session, event)
        };
        let on_status = {
            let state = self.clone();
            move |status| state.set_status(status)
        };
        let on_error = {
            let state = self.clone();
            move |err| state.handle_failure(&session, err)
        };
        ChannelCallbacks::new(on_event, on_status, on_error)
    }
}

/// Owns at most one realtime channel: open while a session exists and the
/// widget is open, closed otherwise.
pub struct SessionCoordinator {
    config: WidgetConfig,
    transports: SharedTransports,
    state: LiveChatState,
    /// Single permit; a channel's driver holds it while it owns a transport.
    slot: Arc<Semaphore>,
    session: Option<SessionId>,
    widget_open: bool,
    channel: Option<RealtimeChannel>,
}

impl SessionCoordinator {
    pub fn new(config: WidgetConfig, transports: SharedTransports, state: LiveChatState) -> Self {
        Self {
            config,
            transports,
            state,
            slot: Arc::new(Semaphore::new(1)),
            session: None,
            widget_open: false,
            channel: None,
        }
    }

    pub fn state(&self) -> &LiveChatState {
        &self.state
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub fn is_widget_open(&self) -> bool {
        self.widget_open
    }

    /// Variant of the current channel, if one exists.
    pub fn channel_kind(&self) -> Option<ChannelKind> {
        self.channel.as_ref().map(RealtimeChannel::kind)
    }

    /// Must be called inside a tokio runtime.
    pub fn set_session(&mut self, session: Option<SessionId>) {
        self.session = session;
        self.evaluate();
    }

    /// Must be called inside a tokio runtime.
    pub fn set_widget_open(&mut self, open: bool) {
        self.widget_open = open;
        self.evaluate();
    }

    /// Change both inputs and re-evaluate once.
    pub fn update(&mut self, session: Option<SessionId>, widget_open: bool) {
        self.session = session;
        self.widget_open = widget_open;
        self.evaluate();
    }

    /// Replace the current channel with a fresh one, restoring the full
    /// reconnect budget. No-op when no channel should exist.
    pub fn reconnect(&mut self) {
        self.close_channel();
        self.evaluate();
    }

    /// Close the channel and forget both inputs.
    pub fn shutdown(&mut self) {
        self.session = None;
        self.widget_open = false;
        self.close_channel();
    }

    fn wanted_session(&self) -> Option<SessionId> {
        if self.widget_open {
            self.session.clone()
        } else {
            None
        }
    }

    fn evaluate(&mut self) {
        let wanted = self.wanted_session();
        if let (Some(channel), Some(session)) = (&self.channel, &wanted) {
            if channel.session() == session {
                return;
            }
        }

        self.close_channel();
        if let Some(session) = wanted {
            self.open_channel(session);
        }
    }

    fn open_channel(&mut self, session: SessionId) {
        let kind = if self.transports.websocket_available() {
            ChannelKind::WebSocket
        } else {
            ChannelKind::EventStream
        };
        tracing::info!(session = %session, transport = %kind, "opening realtime channel");

        let callbacks = self.state.callbacks(session.clone());
        self.channel = Some(RealtimeChannel::open(
            kind,
            session,
            &self.config,
            self.transports.clone(),
            callbacks,
            self.slot.clone(),
        ));
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.state.set_status(ConnectionStatus::Disconnected);
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.close_channel();
    }
}
