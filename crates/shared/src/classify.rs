//! Failure classification.
//!
//! Application error codes are matched against numeric bands first; only when
//! no band claims the code does the HTTP (or transport) status decide.

use crate::taxonomy::ErrorKind;

/// An inclusive range of application error codes owned by one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBand {
    pub start: u32,
    pub end: u32,
    pub kind: ErrorKind,
}

impl CodeBand {
    pub const fn new(start: u32, end: u32, kind: ErrorKind) -> Self {
        Self { start, end, kind }
    }

    pub const fn single(code: u32, kind: ErrorKind) -> Self {
        Self::new(code, code, kind)
    }

    pub fn contains(&self, code: u32) -> bool {
        (self.start..=self.end).contains(&code)
    }
}

/// Registered bands, checked in order. First match wins, so a band nested in
/// a broader one must come before it.
pub const CODE_BANDS: &[CodeBand] = &[
    CodeBand::single(8020, ErrorKind::Config),
    CodeBand::new(8100, 8199, ErrorKind::Session),
    CodeBand::new(8000, 8999, ErrorKind::Checkout),
    CodeBand::new(7000, 7999, ErrorKind::Cart),
];

/// Kind for an application code, if any registered band claims it.
pub fn kind_for_code(code: u32) -> Option<ErrorKind> {
    kind_for_code_in(CODE_BANDS, code)
}

pub fn kind_for_code_in(bands: &[CodeBand], code: u32) -> Option<ErrorKind> {
    bands.iter().find(|band| band.contains(code)).map(|band| band.kind)
}

/// Kind for a raw HTTP status. `0` means the request never got a response.
pub fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        0 => ErrorKind::Network,
        401 | 403 => ErrorKind::Auth,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit,
        504 | 524 => ErrorKind::Timeout,
        502 | 503 => ErrorKind::Server,
        s if s >= 500 => ErrorKind::Server,
        s if s >= 400 => ErrorKind::Validation,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a failure from its status and optional application code.
pub fn classify(status: u16, application_code: Option<u32>) -> ErrorKind {
    application_code
        .and_then(kind_for_code)
        .unwrap_or_else(|| kind_for_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        assert_eq!(kind_for_status(0), ErrorKind::Network);
        assert_eq!(kind_for_status(401), ErrorKind::Auth);
        assert_eq!(kind_for_status(403), ErrorKind::Auth);
        assert_eq!(kind_for_status(404), ErrorKind::NotFound);
        assert_eq!(kind_for_status(429), ErrorKind::RateLimit);
        assert_eq!(kind_for_status(504), ErrorKind::Timeout);
        assert_eq!(kind_for_status(524), ErrorKind::Timeout);
        assert_eq!(kind_for_status(502), ErrorKind::Server);
        assert_eq!(kind_for_status(500), ErrorKind::Server);
        assert_eq!(kind_for_status(422), ErrorKind::Validation);
        assert_eq!(kind_for_status(302), ErrorKind::Unknown);
        assert_eq!(kind_for_status(200), ErrorKind::Unknown);
    }

    #[test]
    fn unbanded_code_falls_back_to_status() {
        assert_eq!(classify(503, Some(42)), ErrorKind::Server);
        assert_eq!(classify(404, None), ErrorKind::NotFound);
    }

    #[test]
    fn registration_order_decides_overlaps() {
        let broad_first = [
            CodeBand::new(8000, 8999, ErrorKind::Checkout),
            CodeBand::new(8100, 8199, ErrorKind::Session),
        ];
        assert_eq!(kind_for_code_in(&broad_first, 8150), Some(ErrorKind::Checkout));
        assert_eq!(kind_for_code(8150), Some(ErrorKind::Session));
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(kind_for_code(7000), Some(ErrorKind::Cart));
        assert_eq!(kind_for_code(7999), Some(ErrorKind::Cart));
        assert_eq!(kind_for_code(8100), Some(ErrorKind::Session));
        assert_eq!(kind_for_code(8199), Some(ErrorKind::Session));
        assert_eq!(kind_for_code(8200), Some(ErrorKind::Checkout));
        assert_eq!(kind_for_code(6999), None);
        assert_eq!(kind_for_code(9000), None);
    }
}
