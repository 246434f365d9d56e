//! Livechat Client - realtime transport for the chat widget
//!
//! This crate keeps the widget's live channel to the merchant backend open,
//! falls back to server-push when sockets are unavailable, and turns every
//! failure into a queued, user-facing `WidgetError`.

pub mod actions;
pub mod api_client;
pub mod config;
pub mod error_queue;
pub mod logging;
pub mod messages;
pub mod realtime;
pub mod transport;
pub mod widget;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use actions::{ActionLog, ActionReplayer, WidgetAction};
pub use api_client::ApiClient;
pub use config::{ConfigError, WidgetConfig};
pub use error_queue::{AutoDismiss, ErrorQueue};
pub use messages::MessageLog;
pub use realtime::{ChannelKind, LiveChatState, SessionCoordinator};
pub use transport::{NativeTransports, TransportError, TransportProvider};
pub use widget::LiveChat;
