use livechat_shared::{
    classify, ErrorContext, ErrorKind, Severity, WidgetError, CODE_BANDS,
};

#[test]
fn every_5xx_is_a_critical_retryable_server_error() {
    for status in 500..=599u16 {
        if matches!(status, 504 | 524) {
            continue;
        }
        let err = WidgetError::classify(status, None, ErrorContext::new());
        assert_eq!(err.kind, ErrorKind::Server, "status {status}");
        assert_eq!(err.severity, Severity::Critical, "status {status}");
        assert!(err.retryable, "status {status}");
    }
    for status in [502u16, 503, 600, 999] {
        assert_eq!(classify(status, None), ErrorKind::Server);
    }
}

#[test]
fn gateway_timeouts_are_timeouts() {
    for status in [504u16, 524] {
        let err = WidgetError::classify(status, None, ErrorContext::new());
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.severity, Severity::Warning);
        assert!(err.retryable);
    }
}

#[test]
fn status_zero_is_a_retryable_network_warning() {
    let err = WidgetError::classify(0, None, ErrorContext::new());
    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.severity, Severity::Warning);
    assert!(err.retryable);
}

#[test]
fn too_many_requests_without_code() {
    let err = WidgetError::classify(429, None, ErrorContext::new());
    assert_eq!(err.kind, ErrorKind::RateLimit);
    assert_eq!(err.severity, Severity::Warning);
    assert!(err.retryable);
}

#[test]
fn code_8020_is_config_whatever_the_status() {
    for status in [0u16, 200, 400, 401, 404, 429, 500, 503] {
        let err = WidgetError::classify(status, Some(8020), ErrorContext::new());
        assert_eq!(err.kind, ErrorKind::Config, "status {status}");
        assert_eq!(err.code, 8020);
        assert!(!err.retryable);
    }
}

#[test]
fn nested_bands_win_over_their_enclosing_band() {
    for (i, narrow) in CODE_BANDS.iter().enumerate() {
        for broad in &CODE_BANDS[i + 1..] {
            let nested = broad.start <= narrow.start && narrow.end <= broad.end;
            if !nested {
                continue;
            }
            for code in [narrow.start, narrow.end, (narrow.start + narrow.end) / 2] {
                assert_eq!(classify(500, Some(code)), narrow.kind, "code {code}");
            }
        }
    }
    assert_eq!(classify(400, Some(8150)), ErrorKind::Session);
    assert_eq!(classify(400, Some(8500)), ErrorKind::Checkout);
    assert_eq!(classify(400, Some(7100)), ErrorKind::Cart);
}

#[test]
fn client_errors_without_code_are_validation() {
    for status in [400u16, 405, 409, 422] {
        assert_eq!(classify(status, None), ErrorKind::Validation);
    }
    assert_eq!(classify(401, None), ErrorKind::Auth);
    assert_eq!(classify(403, None), ErrorKind::Auth);
    assert_eq!(classify(404, None), ErrorKind::NotFound);
}
