//! Widget error records and the error envelope returned by the chat API.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::classify::classify;
use crate::taxonomy::{ErrorKind, Severity};

/// Error body returned by the merchant chat API.
///
/// Backends are inconsistent about which of `detail`, `message` and `title`
/// they fill in, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// Application error code, matched against the registered code bands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Seconds the client should wait before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    /// Most specific non-empty human-readable text: `detail`, then `message`,
    /// then `title`.
    pub fn best_detail(&self) -> Option<&str> {
        [&self.detail, &self.message, &self.title]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}

/// Attempt to parse an API error body. Returns `None` for non-JSON bodies.
pub fn parse_error_body(body: &str) -> Option<ErrorBody> {
    serde_json::from_str::<ErrorBody>(body).ok()
}

/// API error type for client-side use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Network(String),
    Timeout(String),
    Http {
        status: u16,
        body: String,
        /// Value of a `Retry-After` header, in seconds.
        retry_after: Option<u64>,
    },
    Deserialize(String),
}

impl ApiError {
    /// The HTTP status, or `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            _ => 0,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            ApiError::Http { status, body, .. } => write!(f, "HTTP {}: {}", status, body),
            ApiError::Deserialize(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Caller-supplied context copied onto a [`WidgetError`] at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub detail: Option<String>,
    pub retry_after: Option<u64>,
    pub retry_action: Option<String>,
    pub fallback_url: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn with_retry_action(mut self, label: impl Into<String>) -> Self {
        self.retry_action = Some(label.into());
        self
    }

    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = Some(url.into());
        self
    }
}

/// One occurrence of a user-facing error.
///
/// Everything except `dismissed` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetError {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Application code when one was supplied, otherwise the HTTP status.
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    pub detail: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    pub dismissed: bool,
}

impl WidgetError {
    /// Stamp a new error of `kind` with a fresh id and timestamp.
    pub fn new(kind: ErrorKind, code: u32, context: ErrorContext) -> Self {
        let profile = kind.profile();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            code,
            severity: profile.severity,
            message: profile.title.to_string(),
            detail: context
                .detail
                .unwrap_or_else(|| profile.detail.to_string()),
            retryable: profile.retryable,
            retry_after: context.retry_after,
            retry_action: context.retry_action,
            fallback_url: context.fallback_url,
            timestamp: Utc::now().timestamp_millis(),
            dismissed: false,
        }
    }

    /// Classify a raw status/code pair and build the record.
    pub fn classify(status: u16, application_code: Option<u32>, context: ErrorContext) -> Self {
        let kind = classify(status, application_code);
        let code = application_code.unwrap_or(u32::from(status));
        Self::new(kind, code, context)
    }

    /// Build the record for a failed API call.
    ///
    /// Server-supplied detail and `retry_after` win over the context only when
    /// the context leaves them empty. Transport failures carry no server
    /// detail, so the kind's default text is shown.
    pub fn from_api_error(error: &ApiError, mut context: ErrorContext) -> Self {
        match error {
            ApiError::Network(_) => Self::new(ErrorKind::Network, 0, context),
            ApiError::Timeout(_) => Self::new(ErrorKind::Timeout, 0, context),
            ApiError::Deserialize(_) => Self::new(ErrorKind::Unknown, 0, context),
            ApiError::Http {
                status,
                body,
                retry_after,
            } => {
                let parsed = parse_error_body(body).unwrap_or_default();
                if context.detail.is_none() {
                    context.detail = parsed.best_detail().map(str::to_string);
                }
                if context.retry_after.is_none() {
                    context.retry_after = parsed.retry_after.or(*retry_after);
                }
                Self::classify(*status, parsed.code, context)
            }
        }
    }

    /// Label for the follow-up action: the caller's label when given, else
    /// the kind's default.
    pub fn action_label(&self) -> &str {
        self.retry_action
            .as_deref()
            .unwrap_or(self.kind.profile().action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_detail_prefers_detail_then_message_then_title() {
        let body = ErrorBody {
            title: Some("Bad Request".into()),
            message: Some("  ".into()),
            detail: None,
            ..Default::default()
        };
        assert_eq!(body.best_detail(), Some("Bad Request"));

        let body = ErrorBody {
            title: Some("Bad Request".into()),
            message: Some("quantity must be positive".into()),
            ..Default::default()
        };
        assert_eq!(body.best_detail(), Some("quantity must be positive"));
    }

    #[test]
    fn parse_error_body_tolerates_garbage() {
        assert_eq!(parse_error_body("<html>502</html>"), None);
        let body = parse_error_body(r#"{"code":7004,"detail":"out of stock"}"#).unwrap();
        assert_eq!(body.code, Some(7004));
        assert_eq!(body.detail.as_deref(), Some("out of stock"));
    }

    #[test]
    fn new_errors_get_distinct_ids() {
        let a = WidgetError::new(ErrorKind::Network, 0, ErrorContext::new());
        let b = WidgetError::new(ErrorKind::Network, 0, ErrorContext::new());
        assert_ne!(a.id, b.id);
        assert!(!a.dismissed);
    }

    #[test]
    fn network_failures_keep_the_default_detail() {
        let err = WidgetError::from_api_error(
            &ApiError::Network("error sending request for url (http://10.0.0.1/)".into()),
            ErrorContext::new(),
        );
        assert_eq!(err.kind, ErrorKind::Network);
        assert_eq!(err.detail, ErrorKind::Network.profile().detail);
    }

    #[test]
    fn context_is_copied() {
        let err = WidgetError::classify(
            503,
            None,
            ErrorContext::new()
                .with_retry_action("Send again")
                .with_fallback_url("https://shop.example/contact"),
        );
        assert_eq!(err.kind, ErrorKind::Server);
        assert_eq!(err.code, 503);
        assert_eq!(err.action_label(), "Send again");
        assert_eq!(err.fallback_url.as_deref(), Some("https://shop.example/contact"));
        assert_eq!(err.message, "Something went wrong");
    }

    #[test]
    fn api_http_error_uses_body_code_and_detail() {
        let err = WidgetError::from_api_error(
            &ApiError::Http {
                status: 400,
                body: r#"{"code":8150,"message":"conversation closed"}"#.into(),
                retry_after: None,
            },
            ErrorContext::new(),
        );
        assert_eq!(err.kind, ErrorKind::Session);
        assert_eq!(err.code, 8150);
        assert_eq!(err.detail, "conversation closed");
        assert_eq!(err.action_label(), "Start a new chat");
    }

    #[test]
    fn retry_after_header_used_when_body_has_none() {
        let err = WidgetError::from_api_error(
            &ApiError::Http {
                status: 429,
                body: String::new(),
                retry_after: Some(30),
            },
            ErrorContext::new(),
        );
        assert_eq!(err.kind, ErrorKind::RateLimit);
        assert_eq!(err.retry_after, Some(30));
        assert!(err.retryable);
    }

    #[test]
    fn serializes_with_type_field() {
        let err = WidgetError::new(ErrorKind::Auth, 401, ErrorContext::new());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "auth");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["retryable"], false);
        assert!(json.get("retryAfter").is_none());
    }
}
