use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use warden_common::{ClaimMap, ClaimValue};
use warden_lib::{
    config::Settings,
    session::{LoginOptions, SessionAdapter},
    AuthError, AuthService, Credential, ManualClock, StoreError, Warden,
};

use crate::test_utils::{setup_engine, test_settings, START};

#[tokio::test]
async fn test_sliding_expiry_never_passes_absolute() {
    let mut settings = test_settings();
    settings.session.absolute_ttl_secs = 3600;
    settings.session.sliding_ttl_secs = 600;
    settings.session.max_idle_secs = 600;
    let (warden, clock) = setup_engine(settings);
    let sessions = warden.auth.sessions();

    let grant = sessions.login("u1", LoginOptions::default()).await.unwrap();
    for _ in 0..11 {
        clock.advance_secs(300);
        sessions.validate(&grant.session_id, None, false).await.unwrap();
        let record = sessions.store().get(&grant.session_id).await.unwrap();
        assert!(record.idle_expiry <= record.absolute_expiry);
    }

    // Touched moments ago, but the ceiling has passed
    clock.advance_secs(301);
    let err = sessions.validate(&grant.session_id, None, false).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::Expired));
}

#[tokio::test]
async fn test_csrf_mismatch_on_state_change() {
    let (warden, _) = setup_engine(test_settings());
    let grant = warden.auth.issue_session("u1", LoginOptions::default()).await.unwrap();

    let forged = Credential::new(&grant.session_id)
        .with_csrf("AAAAAAAAAAAAAAAAAAAAAA.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
        .state_changing();
    let err = warden.auth.authenticate(forged).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::CsrfMismatch));

    // Read-only access does not need one
    assert!(warden.auth.authenticate(Credential::new(&grant.session_id)).await.is_ok());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (warden, _) = setup_engine(test_settings());
    let grant = warden.auth.issue_session("u1", LoginOptions::default()).await.unwrap();

    warden.auth.logout(&grant.session_id).await.unwrap();
    warden.auth.logout(&grant.session_id).await.unwrap();
    warden.auth.logout("never-existed").await.unwrap();
}

#[tokio::test]
async fn test_session_data_round_trips_through_principal() {
    let (warden, _) = setup_engine(test_settings());
    let mut data = ClaimMap::new();
    data.insert("tenant".to_string(), ClaimValue::from("acme"));
    let grant = warden
        .auth
        .issue_session("u1", LoginOptions::default().with_data(data.clone()))
        .await
        .unwrap();

    let principal = warden.auth.authenticate(Credential::new(&grant.session_id)).await.unwrap();
    assert_eq!(principal.claims, data);
}

#[tokio::test]
async fn test_logout_everywhere_and_sweep() {
    let (warden, clock) = setup_engine(test_settings());
    let sessions = warden.auth.sessions();

    let a = sessions.login("u1", LoginOptions::default()).await.unwrap();
    sessions.login("u1", LoginOptions::default()).await.unwrap();
    let other = sessions.login("u2", LoginOptions::default()).await.unwrap();

    assert_eq!(sessions.revoke_principal("u1").await.unwrap(), 2);
    let err = sessions.validate(&a.session_id, None, false).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::NotFound));

    // u2 goes idle past max_idle_secs and is swept
    clock.advance_secs(Settings::default().session.max_idle_secs as i64 + 1);
    assert_eq!(sessions.sweep_expired().await.unwrap(), 1);
    let err = sessions.validate(&other.session_id, None, false).await.unwrap_err();
    assert_eq!(err.auth(), Some(AuthError::NotFound));
}

#[tokio::test]
async fn test_rotation_keeps_principal() {
    let (warden, _) = setup_engine(test_settings());
    let sessions = warden.auth.sessions();
    let grant = sessions.login("u1", LoginOptions::default()).await.unwrap();

    let rotated = sessions.rotate(&grant.session_id).await.unwrap();
    let write = Credential::new(&rotated.session_id)
        .with_csrf(&rotated.csrf_token)
        .state_changing();
    assert_eq!(warden.auth.authenticate(write).await.unwrap().id, "u1");
    assert!(warden.auth.authenticate(Credential::new(&grant.session_id)).await.is_err());
}

/// Backend that never answers
struct HangingAdapter;

#[async_trait]
impl SessionAdapter for HangingAdapter {
    async fn put(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, StoreError> {
        std::future::pending().await
    }
    async fn delete(&self, _: &str) -> Result<(), StoreError> {
        std::future::pending().await
    }
    async fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_adapter_timeout_is_transient_not_not_found() {
    let clock = Arc::new(ManualClock::at_unix(START));
    let warden = Warden::new(test_settings(), Arc::new(HangingAdapter), clock).unwrap();

    let err = warden
        .auth
        .authenticate(Credential::new(&"s".repeat(43)))
        .await
        .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(err.auth(), None);
    assert_eq!(err.error_code(), "STORE_TIMEOUT");

    let err = warden.auth.issue_session("u1", LoginOptions::default()).await.unwrap_err();
    assert!(err.is_transient());
}
