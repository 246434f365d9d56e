//! Dioxus binding for the realtime layer.
//!
//! NOTE: Components should read connection status and messages from the
//! returned handle, not from channel events.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use dioxus::prelude::*;
use livechat_shared::{ConnectionStatus, SessionId};

use super::coordinator::{LiveChatState, SessionCoordinator};
use crate::config::WidgetConfig;
use crate::error_queue::ErrorQueue;
use crate::transport::{NativeTransports, SharedTransports};

/// What a component gets back from [`use_live_chat`].
#[derive(Clone)]
pub struct LiveChatHandle {
    pub state: LiveChatState,
    /// Mirrors the coordinator's status (reactive).
    pub status: Signal<ConnectionStatus>,
}

/// Hook that owns a session coordinator for the component's lifetime.
///
/// # Arguments
/// * `session` - The current chat session, if any
/// * `widget_open` - Whether the chat panel is open
/// * `config` - Only read on first render
///
/// A channel is open while both a session exists and the widget is open.
/// The coordinator is shut down when the component unmounts.
pub fn use_live_chat(
    session: Signal<Option<SessionId>>,
    widget_open: Signal<bool>,
    config: WidgetConfig,
) -> LiveChatHandle {
    let coordinator = use_hook(move || {
        let state = LiveChatState::new(ErrorQueue::new(config.error_auto_dismiss));
        let transports: SharedTransports = Arc::new(NativeTransports::from_config(&config));
        Rc::new(RefCell::new(SessionCoordinator::new(config, transports, state)))
    });
    let state = coordinator.borrow().state().clone();
    let mut status = use_signal(|| state.status());

    {
        let state = state.clone();
        use_future(move || {
            let mut rx = state.watch_status();
            async move {
                while rx.changed().await.is_ok() {
                    let next = *rx.borrow_and_update();
                    status.set(next);
                }
            }
        });
    }

    {
        let coordinator = coordinator.clone();
        use_effect(move || {
            let session = session.read().clone();
            let open = *widget_open.read();
            coordinator.borrow_mut().update(session, open);
        });
    }

    use_drop(move || coordinator.borrow_mut().shutdown());

    LiveChatHandle { state, status }
}
