//! Error taxonomy: the closed set of error kinds the widget can show, and the
//! fixed presentation profile attached to each of them.

use serde::{Deserialize, Serialize};

/// Every failure the widget surfaces resolves to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Timeout,
    RateLimit,
    Server,
    Auth,
    NotFound,
    Validation,
    Cart,
    Checkout,
    Session,
    Config,
    Unknown,
}

/// How loudly an error should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Static presentation data for one [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    pub kind: ErrorKind,
    /// Short title shown as the error message.
    pub title: &'static str,
    /// Detail used when the server supplied none.
    pub detail: &'static str,
    /// Label for the suggested follow-up action.
    pub action: &'static str,
    pub severity: Severity,
    pub retryable: bool,
}

const fn entry(
    kind: ErrorKind,
    title: &'static str,
    detail: &'static str,
    action: &'static str,
    severity: Severity,
    retryable: bool,
) -> KindProfile {
    KindProfile {
        kind,
        title,
        detail,
        action,
        severity,
        retryable,
    }
}

/// Lookup table, indexed in [`ErrorKind::ALL`] order.
static PROFILES: [KindProfile; 12] = [
    entry(
        ErrorKind::Network,
        "Connection problem",
        "We couldn't reach the store. Check your internet connection.",
        "Retry",
        Severity::Warning,
        true,
    ),
    entry(
        ErrorKind::Timeout,
        "Request timed out",
        "The store took too long to respond.",
        "Try again",
        Severity::Warning,
        true,
    ),
    entry(
        ErrorKind::RateLimit,
        "Too many requests",
        "You're sending messages too quickly. Please wait a moment.",
        "Wait and retry",
        Severity::Warning,
        true,
    ),
    entry(
        ErrorKind::Server,
        "Something went wrong",
        "The store is having trouble right now.",
        "Try again",
        Severity::Critical,
        true,
    ),
    entry(
        ErrorKind::Auth,
        "Session expired",
        "Your chat session is no longer authorized.",
        "Reload chat",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::NotFound,
        "Not found",
        "The requested item could not be found.",
        "Go back",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Validation,
        "Invalid request",
        "Some of the information sent was not accepted.",
        "Check your input",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Cart,
        "Cart problem",
        "Your cart could not be updated.",
        "Refresh cart",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Checkout,
        "Checkout problem",
        "Checkout could not be completed.",
        "Return to cart",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Session,
        "Chat session ended",
        "This conversation is no longer active.",
        "Start a new chat",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Config,
        "Chat unavailable",
        "Live chat is not configured for this store.",
        "Contact the store",
        Severity::Error,
        false,
    ),
    entry(
        ErrorKind::Unknown,
        "Unexpected error",
        "Something unexpected happened.",
        "Try again",
        Severity::Error,
        false,
    ),
];

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::RateLimit,
        ErrorKind::Server,
        ErrorKind::Auth,
        ErrorKind::NotFound,
        ErrorKind::Validation,
        ErrorKind::Cart,
        ErrorKind::Checkout,
        ErrorKind::Session,
        ErrorKind::Config,
        ErrorKind::Unknown,
    ];

    pub fn profile(self) -> &'static KindProfile {
        &PROFILES[self as usize]
    }

    pub fn severity(self) -> Severity {
        self.profile().severity
    }

    pub fn is_retryable(self) -> bool {
        self.profile().retryable
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Server => "server",
            ErrorKind::Auth => "auth",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
            ErrorKind::Cart => "cart",
            ErrorKind::Checkout => "checkout",
            ErrorKind::Session => "session",
            ErrorKind::Config => "config",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_kind() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.profile().kind, kind);
        }
    }

    #[test]
    fn only_transient_kinds_are_retryable() {
        let retryable: Vec<_> = ErrorKind::ALL
            .into_iter()
            .filter(|k| k.is_retryable())
            .collect();
        assert_eq!(
            retryable,
            vec![
                ErrorKind::Network,
                ErrorKind::Timeout,
                ErrorKind::RateLimit,
                ErrorKind::Server
            ]
        );
    }

    #[test]
    fn severity_mapping() {
        assert_eq!(ErrorKind::Network.severity(), Severity::Warning);
        assert_eq!(ErrorKind::Timeout.severity(), Severity::Warning);
        assert_eq!(ErrorKind::RateLimit.severity(), Severity::Warning);
        assert_eq!(ErrorKind::Auth.severity(), Severity::Error);
        assert_eq!(ErrorKind::Session.severity(), Severity::Error);
        assert_eq!(ErrorKind::Server.severity(), Severity::Critical);
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::Validation,
            ErrorKind::Cart,
            ErrorKind::Checkout,
            ErrorKind::Config,
            ErrorKind::Unknown,
        ] {
            assert_eq!(kind.severity(), Severity::Error, "{kind}");
        }
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::RateLimit).unwrap(),
            "\"rate_limit\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
