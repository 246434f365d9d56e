//! HTTP API client for the chat backend.

use livechat_shared::{
    ApiError, ChatMessage, SendMessageRequest, SessionId, SessionInfo, StartSessionRequest,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::WidgetConfig;

/// HTTP client for the session and message endpoints.
///
/// Failures are returned as [`ApiError`] and never retried here; callers
/// classify them into a `WidgetError` and queue it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: WidgetConfig,
}

impl ApiClient {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Start a new chat session.
    pub async fn start_session(&self, request: &StartSessionRequest) -> Result<SessionInfo, ApiError> {
        self.post_json("/api/chat/sessions", request).await
    }

    /// Post a customer message. Returns the message as stored by the server.
    pub async fn send_message(&self, session: &SessionId, text: &str) -> Result<ChatMessage, ApiError> {
        let body = SendMessageRequest {
            text: text.to_string(),
        };
        self.post_json(&messages_path(session), &body).await
    }

    /// Fetch the session's message history.
    pub async fn load_history(&self, session: &SessionId) -> Result<Vec<ChatMessage>, ApiError> {
        self.get_json(&messages_path(session)).await
    }

    /// Make a GET request
    pub async fn get_json<TRes: DeserializeOwned>(&self, path: &str) -> Result<TRes, ApiError> {
        let rb = self.client.get(self.config.api_url(path));
        self.execute(rb).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json<TReq: Serialize, TRes: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TRes, ApiError> {
        let body_bytes = serde_json::to_vec(body).map_err(|e| ApiError::Deserialize(e.to_string()))?;
        let rb = self
            .client
            .post(self.config.api_url(path))
            .header("Content-Type", "application/json")
            .body(body_bytes);
        self.execute(rb).await
    }

    async fn execute<TRes: DeserializeOwned>(&self, rb: RequestBuilder) -> Result<TRes, ApiError> {
        let resp = rb
            .timeout(self.config.connect_timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = resp.status().as_u16();
        let is_success = resp.status().is_success();
        let retry_after = parse_retry_after(resp.headers());
        let text = resp.text().await.map_err(map_send_error)?;

        if !is_success {
            tracing::warn!(status, "API request failed");
            return Err(ApiError::Http {
                status,
                body: text,
                retry_after,
            });
        }

        if text.is_empty() {
            serde_json::from_str("null").map_err(|e| ApiError::Deserialize(e.to_string()))
        } else {
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialize(e.to_string()))
        }
    }
}

fn messages_path(session: &SessionId) -> String {
    format!(
        "/api/chat/sessions/{}/messages",
        urlencoding::encode(session.as_str())
    )
}

fn map_send_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else {
        ApiError::Network(err.to_string())
    }
}

/// `Retry-After` in delta-seconds form. HTTP dates are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
