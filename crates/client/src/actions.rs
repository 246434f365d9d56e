//! Replayable user actions behind the "Retry" button.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use livechat_shared::{SessionId, WidgetError};

/// A user-initiated operation that can be re-run verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetAction {
    StartSession,
    SendMessage { session: SessionId, text: String },
    LoadHistory { session: SessionId },
    Reconnect,
}

impl WidgetAction {
    /// Label shown on the retry button for errors raised by this action.
    pub fn label(&self) -> &'static str {
        match self {
            WidgetAction::StartSession => "Start chat",
            WidgetAction::SendMessage { .. } => "Resend",
            WidgetAction::LoadHistory { .. } => "Reload messages",
            WidgetAction::Reconnect => "Reconnect",
        }
    }
}

/// Something that knows how to execute a [`WidgetAction`].
#[async_trait]
pub trait ActionReplayer: Send + Sync {
    async fn replay(&self, action: &WidgetAction) -> Result<(), WidgetError>;
}

/// Remembers the last user-initiated action. Cloning shares the log.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    last: Arc<Mutex<Option<WidgetAction>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: WidgetAction) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(action);
    }

    pub fn last(&self) -> Option<WidgetAction> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Re-run the last action. Returns `None` when nothing was recorded.
    ///
    /// A failure comes back as a new [`WidgetError`] for the caller to
    /// queue; the original error is left untouched.
    pub async fn replay_last(
        &self,
        replayer: &dyn ActionReplayer,
    ) -> Option<Result<(), WidgetError>> {
        let action = self.last()?;
        tracing::debug!(action = action.label(), "replaying last action");
        Some(replayer.replay(&action).await)
    }
}
