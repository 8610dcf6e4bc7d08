use std::time::Duration;

use warden_lib::{AuthError, EngineError, StoreError};

const ALL_AUTH: [AuthError; 7] = [
    AuthError::Malformed,
    AuthError::SignatureInvalid,
    AuthError::Expired,
    AuthError::Revoked,
    AuthError::NotFound,
    AuthError::CsrfMismatch,
    AuthError::ClockSkew,
];

#[test]
fn test_boundary_message_does_not_leak_variant() {
    for err in ALL_AUTH {
        assert_eq!(err.sanitized_message(), "Authentication failed");
        assert_eq!(EngineError::from(err).sanitized_message(), "Authentication failed");
    }
}

#[test]
fn test_error_codes_are_distinct() {
    let mut codes: Vec<&str> = ALL_AUTH.iter().map(|e| e.error_code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), ALL_AUTH.len());
}

#[test]
fn test_transient_store_failures() {
    let timeout = EngineError::from(StoreError::Timeout(Duration::from_millis(5)));
    assert!(timeout.is_transient());
    assert_eq!(timeout.auth(), None);
    assert_eq!(timeout.error_code(), "STORE_TIMEOUT");
    assert_eq!(timeout.sanitized_message(), "Service temporarily unavailable");

    let unavailable = EngineError::from(StoreError::Unavailable("down".to_string()));
    assert!(unavailable.is_transient());

    let corrupt = EngineError::from(StoreError::Corrupt("bad json".to_string()));
    assert!(!corrupt.is_transient());
    assert_eq!(corrupt.sanitized_message(), "Authentication failed");
}

#[test]
fn test_missing_session_is_not_transient() {
    let err = EngineError::from(StoreError::NotFound);
    assert_eq!(err, EngineError::Auth(AuthError::NotFound));
    assert!(!err.is_transient());
}

#[test]
fn test_security_events() {
    let flagged: Vec<AuthError> = ALL_AUTH.into_iter().filter(|e| e.is_security_event()).collect();
    assert_eq!(flagged, vec![AuthError::SignatureInvalid, AuthError::CsrfMismatch]);
}
