use warden_common::AuthMethod;
use warden_lib::{
    session::LoginOptions, AuthError, AuthService, Clock, Credential, CredentialKind,
};

use crate::test_utils::{claims_for, setup_engine, test_settings};

#[tokio::test]
async fn test_end_to_end_token_and_session() {
    let (warden, clock) = setup_engine(test_settings());
    let auth = &warden.auth;

    // Token for u1 signed with k1
    let token = auth.issue_token(claims_for(&clock, "u1", 3600), "k1").unwrap();
    let principal = auth.authenticate(Credential::new(token.as_str())).await.unwrap();
    assert_eq!(principal.id, "u1");
    assert_eq!(principal.auth_method, AuthMethod::Token);

    // Session login for u1
    let grant = auth.issue_session("u1", LoginOptions::default()).await.unwrap();
    let credential = Credential::new(&grant.session_id)
        .with_csrf(&grant.csrf_token)
        .state_changing();
    assert_eq!(credential.kind(), CredentialKind::Session);

    let principal = auth.authenticate(credential).await.unwrap();
    assert_eq!(principal.id, "u1");
    assert_eq!(principal.auth_method, AuthMethod::Session);

    auth.logout(&grant.session_id).await.unwrap();
    let err = auth.authenticate(credential).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::NotFound));
    assert_eq!(err.sanitized_message(), "Authentication failed");
}

#[tokio::test]
async fn test_tampered_token_is_signature_failure() {
    let (warden, clock) = setup_engine(test_settings());
    let token = warden
        .auth
        .issue_token(claims_for(&clock, "u1", 3600), "k1")
        .unwrap()
        .into_string();

    // Swap in a payload claiming a different subject
    let forged_claims = warden
        .auth
        .issue_token(claims_for(&clock, "admin", 3600), "k1")
        .unwrap()
        .into_string();
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[1] = forged_claims.split('.').nth(1).unwrap();
    let forged = parts.join(".");

    let err = warden.auth.authenticate(Credential::new(&forged)).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::SignatureInvalid));
}

#[tokio::test]
async fn test_token_with_unknown_key_id() {
    let (warden, clock) = setup_engine(test_settings());
    let token = warden.auth.issue_token(claims_for(&clock, "u1", 3600), "k1").unwrap();
    assert!(warden.keys.retire("k1"));

    let err = warden.auth.authenticate(Credential::new(token.as_str())).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::SignatureInvalid));
}

#[tokio::test]
async fn test_expired_token_rejected_after_skew() {
    let (warden, clock) = setup_engine(test_settings());
    let token = warden.auth.issue_token(claims_for(&clock, "u1", 10), "k1").unwrap();

    // Default tolerance is 60 seconds
    clock.advance_secs(70);
    assert!(warden.auth.authenticate(Credential::new(token.as_str())).await.is_ok());
    clock.advance_secs(1);
    let err = warden.auth.authenticate(Credential::new(token.as_str())).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::Expired));
}

#[tokio::test]
async fn test_denylisted_token() {
    let (warden, clock) = setup_engine(test_settings());
    let token = warden.auth.issue_token(claims_for(&clock, "u1", 3600), "k1").unwrap();
    let jti = token.claims().token_id().unwrap().to_string();

    warden.denylist.revoke(jti, clock.unix_seconds() + 3600);
    let err = warden.auth.authenticate(Credential::new(token.as_str())).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::Revoked));

    // Past exp but still inside the skew window, so the entry has to stay
    clock.advance_secs(3601);
    assert_eq!(warden.denylist.purge_expired(clock.unix_seconds()), 0);
    let err = warden.auth.authenticate(Credential::new(token.as_str())).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::Revoked));

    // Once the token itself is dead the entry can go
    clock.advance_secs(60);
    assert_eq!(warden.denylist.purge_expired(clock.unix_seconds()), 1);
    let err = warden.auth.authenticate(Credential::new(token.as_str())).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::Expired));
}

#[tokio::test]
async fn test_oversized_and_garbage_credentials() {
    let (warden, _) = setup_engine(test_settings());
    let huge = format!("{}.{}.{}", "a".repeat(5000), "b".repeat(5000), "c");

    for value in [huge.as_str(), "Bearer x", "a.b.c", "x".repeat(43).as_str()] {
        let err = warden.auth.authenticate(Credential::new(value)).await.unwrap_err();
        assert!(err.auth().is_some(), "{value} produced a transient error");
        assert!(!err.is_transient());
    }
}
