//! Realtime module: keeps one live channel open per chat session.
//!
//! This module provides:
//! - A session coordinator that opens a channel only while a session exists
//!   and the widget is open
//! - Two channel variants with one lifecycle (WebSocket, server-push fallback)
//! - Heartbeat and bounded reconnect, owned by each channel's driver task
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 SessionCoordinator                  │
//! │   (session present AND widget open => one channel)  │
//! └─────────────────────────────────────────────────────┘
//!                         │ open / close
//!                 ┌───────┴────────┐
//!                 ▼                ▼
//!        ┌────────────────┐ ┌────────────────┐
//!        │ RealtimeChannel│ │ RealtimeChannel│
//!        │  (WebSocket)   │ │ (event stream) │
//!        │ heartbeat +    │ │ reconnect only │
//!        │ reconnect      │ │                │
//!        └────────────────┘ └────────────────┘
//!                 │                │
//!                 └───────┬────────┘
//!                         ▼ InboundEvent / status / error
//!              ┌─────────────────────┐
//!              │    LiveChatState    │
//!              │ (status, messages,  │
//!              │  error queue)       │
//!              └─────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let state = LiveChatState::new(ErrorQueue::new(config.error_auto_dismiss));
//! let transports = Arc::new(NativeTransports::from_config(&config));
//! let mut coordinator = SessionCoordinator::new(config, transports, state.clone());
//!
//! coordinator.update(Some(session_id), true);
//! let mut status = state.watch_status();
//! while status.changed().await.is_ok() {
//!     println!("{}", *status.borrow());
//! }
//! ```

mod channel;
mod coordinator;
mod event_stream;
mod heartbeat;
#[cfg(feature = "dioxus")]
pub mod hooks;
mod reconnect;
mod socket;

pub use channel::{ChannelCallbacks, ChannelKind, RealtimeChannel};
pub use coordinator::{LiveChatState, SessionCoordinator};
pub use heartbeat::Heartbeat;
pub use reconnect::ReconnectPolicy;
