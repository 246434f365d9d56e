//! Widget configuration.
//!
//! Resolved once by the host application and passed into the coordinator and
//! the API client; nothing in this crate reads page or process state to find
//! the backend on its own.

use std::time::Duration;

use livechat_shared::SessionId;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL `{value}`: {source}")]
    BaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("unsupported URL scheme `{0}`, expected http or https")]
    Scheme(String),
    #[error("{name} must be a non-negative integer, got `{value}`")]
    Number { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Base URL of the merchant chat backend (http or https).
    pub api_base: Url,
    /// Path of the WebSocket endpoint.
    pub realtime_path: String,
    /// Path of the server-push (SSE) endpoint.
    pub event_stream_path: String,
    pub heartbeat_interval: Duration,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts tolerated before the channel gives up.
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
    /// How long a displayed error stays up before it is dismissed.
    pub error_auto_dismiss: Duration,
}

/// Backend used when nothing is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/";

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("DEFAULT_API_BASE is a valid URL"),
            realtime_path: "/api/chat/ws".to_string(),
            event_stream_path: "/api/chat/events".to_string(),
            heartbeat_interval: Duration::from_secs(25),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: 5,
            connect_timeout: Duration::from_secs(10),
            error_auto_dismiss: Duration::from_secs(8),
        }
    }
}

impl WidgetConfig {
    /// Build a config for `base`, keeping every other default.
    ///
    /// A bare host is accepted: local addresses get `http://`, everything
    /// else `https://`.
    pub fn for_base(base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: parse_base_url(base)?,
            ..Self::default()
        })
    }

    /// Read configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LIVECHAT_API_BASE`: backend base URL (default: "http://localhost:8080")
    /// - `LIVECHAT_REALTIME_PATH`: WebSocket path (default: "/api/chat/ws")
    /// - `LIVECHAT_EVENT_STREAM_PATH`: SSE path (default: "/api/chat/events")
    /// - `LIVECHAT_HEARTBEAT_SECS`: heartbeat interval (default: 25)
    /// - `LIVECHAT_RECONNECT_DELAY_MS`: reconnect delay (default: 3000)
    /// - `LIVECHAT_MAX_RECONNECT_ATTEMPTS`: attempt bound (default: 5)
    /// - `LIVECHAT_CONNECT_TIMEOUT_SECS`: connect timeout (default: 10)
    /// - `LIVECHAT_ERROR_DISMISS_SECS`: error auto-dismiss window (default: 8)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("LIVECHAT_API_BASE") {
            Ok(base) => Self::for_base(&base)?,
            Err(_) => Self::default(),
        };

        if let Ok(path) = std::env::var("LIVECHAT_REALTIME_PATH") {
            config.realtime_path = path;
        }
        if let Ok(path) = std::env::var("LIVECHAT_EVENT_STREAM_PATH") {
            config.event_stream_path = path;
        }
        if let Some(secs) = env_number("LIVECHAT_HEARTBEAT_SECS")? {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = env_number("LIVECHAT_RECONNECT_DELAY_MS")? {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(attempts) = env_number("LIVECHAT_MAX_RECONNECT_ATTEMPTS")? {
            config.max_reconnect_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
        }
        if let Some(secs) = env_number("LIVECHAT_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_number("LIVECHAT_ERROR_DISMISS_SECS")? {
            config.error_auto_dismiss = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Absolute HTTP URL for an API path.
    pub fn api_url(&self, path: &str) -> Url {
        let mut url = self.api_base.clone();
        url.set_path(&join_paths(self.api_base.path(), path));
        url
    }

    /// WebSocket endpoint for a session.
    pub fn websocket_url(&self, session: &SessionId) -> Url {
        let mut url = http_to_ws(self.api_url(&self.realtime_path));
        url.query_pairs_mut()
            .append_pair("session_id", session.as_str());
        url
    }

    /// Server-push endpoint for a session.
    pub fn event_stream_url(&self, session: &SessionId) -> Url {
        let mut url = self.api_url(&self.event_stream_path);
        url.query_pairs_mut()
            .append_pair("session_id", session.as_str());
        url
    }
}

fn env_number(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Number { name, value }),
        Err(_) => Ok(None),
    }
}

/// Parse a backend base URL, defaulting the scheme for bare hosts.
pub fn parse_base_url(base: &str) -> Result<Url, ConfigError> {
    let base = base.trim().trim_end_matches('/');
    let with_scheme = if base.contains("://") {
        base.to_string()
    } else if is_local_address(base) {
        format!("http://{base}")
    } else {
        format!("https://{base}")
    };

    let url = Url::parse(&with_scheme).map_err(|source| ConfigError::BaseUrl {
        value: base.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Scheme(other.to_string())),
    }
}

/// Check if a host is a local/development address.
fn is_local_address(host: &str) -> bool {
    let host_part = host.split(':').next().unwrap_or(host);
    host_part == "localhost"
        || host_part == "127.0.0.1"
        || host_part == "0.0.0.0"
        || host_part.starts_with("192.168.")
        || host_part.starts_with("10.")
}

/// Convert HTTP/HTTPS URL to WS/WSS
fn http_to_ws(mut url: Url) -> Url {
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    if url.set_scheme(scheme).is_err() {
        tracing::warn!(%url, scheme, "could not switch URL to a websocket scheme");
    }
    url
}

fn join_paths(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
