//! The widget facade: API calls, realtime coordinator and error queue behind
//! one handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use livechat_shared::{
    ApiError, ErrorContext, ErrorKind, SessionId, StartSessionRequest, WidgetError,
};

use crate::actions::{ActionLog, ActionReplayer, WidgetAction};
use crate::api_client::ApiClient;
use crate::config::WidgetConfig;
use crate::error_queue::ErrorQueue;
use crate::realtime::{ChannelKind, LiveChatState, SessionCoordinator};
use crate::transport::{NativeTransports, SharedTransports};

pub struct LiveChat {
    api: ApiClient,
    state: LiveChatState,
    actions: ActionLog,
    coordinator: Mutex<SessionCoordinator>,
    start_request: StartSessionRequest,
}

impl LiveChat {
    pub fn new(config: WidgetConfig, transports: SharedTransports) -> Self {
        let state = LiveChatState::new(ErrorQueue::new(config.error_auto_dismiss));
        let coordinator = SessionCoordinator::new(config.clone(), transports, state.clone());
        Self {
            api: ApiClient::new(config),
            state,
            actions: ActionLog::new(),
            coordinator: Mutex::new(coordinator),
            start_request: StartSessionRequest::default(),
        }
    }

    /// Widget backed by the native socket and event-stream transports.
    pub fn native(config: WidgetConfig) -> Self {
        let transports = Arc::new(NativeTransports::from_config(&config));
        Self::new(config, transports)
    }

    /// Details sent whenever a session is started.
    pub fn with_start_request(mut self, request: StartSessionRequest) -> Self {
        self.start_request = request;
        self
    }

    fn coordinator(&self) -> MutexGuard<'_, SessionCoordinator> {
        self.coordinator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> &LiveChatState {
        &self.state
    }

    pub fn errors(&self) -> &ErrorQueue {
        self.state.errors()
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn session(&self) -> Option<SessionId> {
        self.coordinator().session().cloned()
    }

    pub fn channel_kind(&self) -> Option<ChannelKind> {
        self.coordinator().channel_kind()
    }

    /// Resume an existing session, e.g. one restored by the host page.
    pub fn attach_session(&self, session: SessionId) {
        self.coordinator().set_session(Some(session));
    }

    pub fn set_widget_open(&self, open: bool) {
        self.coordinator().set_widget_open(open);
    }

    /// Start a new session and make it current.
    pub async fn start_session(&self) -> Result<SessionId, WidgetError> {
        self.perform(WidgetAction::StartSession).await?;
        self.session()
            .ok_or_else(|| self.report_missing_session(&WidgetAction::StartSession))
    }

    pub async fn send_message(&self, text: &str) -> Result<(), WidgetError> {
        let Some(session) = self.session() else {
            return Err(self.report_missing_session(&WidgetAction::StartSession));
        };
        self.perform(WidgetAction::SendMessage {
            session,
            text: text.to_string(),
        })
        .await
    }

    pub async fn load_history(&self) -> Result<(), WidgetError> {
        let Some(session) = self.session() else {
            return Err(self.report_missing_session(&WidgetAction::StartSession));
        };
        self.perform(WidgetAction::LoadHistory { session }).await
    }

    /// Drop the current channel and open a fresh one.
    pub async fn reconnect(&self) -> Result<(), WidgetError> {
        self.perform(WidgetAction::Reconnect).await
    }

    /// Replay whatever the user did last. Returns `None` when there is
    /// nothing to replay.
    pub async fn retry_last(&self) -> Option<Result<(), WidgetError>> {
        self.actions.replay_last(self).await
    }

    pub fn shutdown(&self) {
        self.coordinator().shutdown();
    }

    async fn perform(&self, action: WidgetAction) -> Result<(), WidgetError> {
        self.actions.record(action.clone());
        self.run(&action).await
    }

    /// Execute an action. Failures are queued before they are returned.
    async fn run(&self, action: &WidgetAction) -> Result<(), WidgetError> {
        let result = match action {
            WidgetAction::StartSession => self
                .api
                .start_session(&self.start_request)
                .await
                .map(|info| {
                    tracing::info!(session = %info.session_id, "chat session started");
                    self.coordinator().set_session(Some(info.session_id));
                }),
            WidgetAction::SendMessage { session, text } => self
                .api
                .send_message(session, text)
                .await
                .map(|message| {
                    self.state.push_message(message);
                }),
            WidgetAction::LoadHistory { session } => self
                .api
                .load_history(session)
                .await
                .map(|history| self.state.messages().set_history(history)),
            WidgetAction::Reconnect => {
                self.coordinator().reconnect();
                Ok(())
            }
        };
        result.map_err(|err| self.report(action, &err))
    }

    fn report(&self, action: &WidgetAction, err: &ApiError) -> WidgetError {
        tracing::warn!(action = action.label(), error = %err, "widget action failed");
        let context = ErrorContext::new().with_retry_action(action.label());
        let error = WidgetError::from_api_error(err, context);
        self.errors().add(error.clone());
        error
    }

    fn report_missing_session(&self, action: &WidgetAction) -> WidgetError {
        let context = ErrorContext::new().with_retry_action(action.label());
        let error = WidgetError::new(ErrorKind::Session, 0, context);
        self.errors().add(error.clone());
        error
    }
}

#[async_trait]
impl ActionReplayer for LiveChat {
    async fn replay(&self, action: &WidgetAction) -> Result<(), WidgetError> {
        self.run(action).await
    }
}

impl std::fmt::Debug for LiveChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveChat")
            .field("session", &self.session())
            .field("status", &self.state.status())
            .finish()
    }
}
