// ============================
// crates/warden-lib/src/session/engine.rs
// ============================
//! Session login, validation and revocation on top of [`SessionStore`].
use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, warn};
use warden_common::{AuthMethod, ClaimMap, Principal};

use super::{
    csrf::{derive_token, verify_token},
    token_generator::fingerprint,
    Session, SessionStore,
};
use crate::{
    clock::Clock,
    config::{SessionSettings, MAX_TTL_SECS},
    error::{AuthError, EngineError},
    metrics::{REASON, SESSION_CREATED, SESSION_REJECTED, SESSION_REVOKED, SESSION_VALIDATED},
};

/// Lifetime policy applied to new and validated sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Hard ceiling for sessions created without an explicit TTL
    pub absolute_ttl: chrono::Duration,
    /// Idle extension granted by each validated access
    pub sliding_ttl: chrono::Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for SessionPolicy {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            absolute_ttl: settings.absolute_ttl(),
            sliding_ttl: settings.sliding_ttl(),
        }
    }
}

/// Per-login overrides
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Overrides [`SessionPolicy::absolute_ttl`]
    pub absolute_ttl: Option<chrono::Duration>,
    /// Initial session data, returned as the principal's claims
    pub data: ClaimMap,
}

impl LoginOptions {
    pub fn with_absolute_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.absolute_ttl = Some(ttl);
        self
    }

    pub fn with_data(mut self, data: ClaimMap) -> Self {
        self.data = data;
        self
    }
}

/// What the client receives after a login or rotation
#[derive(Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub session_id: String,
    pub csrf_token: String,
    pub absolute_expiry: DateTime<Utc>,
}

impl fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGrant")
            .field("session", &fingerprint(&self.session_id))
            .field("csrf_token", &"**redacted**")
            .field("absolute_expiry", &self.absolute_expiry)
            .finish()
    }
}

/// Issues, validates and revokes session identifiers
pub struct SessionEngine {
    store: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionEngine {
    pub fn new(store: Arc<SessionStore>, clock: Arc<dyn Clock>, policy: SessionPolicy) -> Self {
        Self { store, clock, policy }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Start a session for an already authenticated principal
    pub async fn login(&self, principal_id: &str, opts: LoginOptions) -> Result<SessionGrant, EngineError> {
        if principal_id.is_empty() {
            return Err(AuthError::Malformed.into());
        }
        let ttl = opts.absolute_ttl.unwrap_or(self.policy.absolute_ttl);
        if ttl <= chrono::Duration::zero() || ttl > chrono::Duration::seconds(MAX_TTL_SECS as i64) {
            return Err(AuthError::Malformed.into());
        }

        let session = self.store.create_with_data(principal_id, ttl, opts.data).await?;
        counter!(SESSION_CREATED).increment(1);
        info!(session = %fingerprint(&session.session_id), principal = principal_id, "session created");
        Ok(grant(&session))
    }

    /// Check a presented session id and slide its idle deadline.
    ///
    /// With `require_csrf`, `csrf_token` must have been derived from this session's secret.
    pub async fn validate(
        &self,
        session_id: &str,
        csrf_token: Option<&str>,
        require_csrf: bool,
    ) -> Result<Principal, EngineError> {
        let result = self.check(session_id, csrf_token, require_csrf).await;
        match &result {
            Ok(_) => counter!(SESSION_VALIDATED).increment(1),
            Err(err) => {
                counter!(SESSION_REJECTED, REASON => err.error_code()).increment(1);
                let session = fingerprint(session_id);
                if err.auth().is_some_and(|e| e.is_security_event()) {
                    warn!(%session, code = err.error_code(), "session rejected");
                } else {
                    debug!(%session, code = err.error_code(), "session rejected");
                }
            },
        }
        result
    }

    async fn check(
        &self,
        session_id: &str,
        csrf_token: Option<&str>,
        require_csrf: bool,
    ) -> Result<Principal, EngineError> {
        let session = self.live(session_id).await?;

        if require_csrf {
            match csrf_token {
                Some(presented) if verify_token(&session.csrf_secret, presented) => {},
                _ => return Err(AuthError::CsrfMismatch.into()),
            }
        }

        let session = self.store.touch(session_id, self.policy.sliding_ttl).await?;
        Ok(Principal {
            id: session.principal_id,
            claims: session.data,
            auth_method: AuthMethod::Session,
        })
    }

    /// End a session. Succeeds for ids that are already gone.
    pub async fn logout(&self, session_id: &str) -> Result<(), EngineError> {
        self.store.revoke(session_id).await?;
        counter!(SESSION_REVOKED).increment(1);
        info!(session = %fingerprint(session_id), "session revoked");
        Ok(())
    }

    /// Mint another CSRF token for a live session
    pub async fn csrf_token(&self, session_id: &str) -> Result<String, EngineError> {
        let session = self.live(session_id).await?;
        Ok(derive_token(&session.csrf_secret))
    }

    /// Replace a live session's data. Does not count as an access.
    pub async fn set_data(&self, session_id: &str, data: ClaimMap) -> Result<(), EngineError> {
        self.live(session_id).await?;
        self.store.update_data(session_id, data).await?;
        Ok(())
    }

    /// Swap a session for a fresh id and CSRF secret, keeping principal, data and absolute expiry.
    /// The old id stops working.
    pub async fn rotate(&self, session_id: &str) -> Result<SessionGrant, EngineError> {
        let old = self.live(session_id).await?;
        let remaining = old.absolute_expiry - self.clock.now();

        let session = self
            .store
            .create_with_data(&old.principal_id, remaining, old.data)
            .await?;
        self.store.revoke(session_id).await?;

        info!(
            from = %fingerprint(session_id),
            to = %fingerprint(&session.session_id),
            "session rotated"
        );
        Ok(grant(&session))
    }

    /// Revoke every session of `principal_id`, returning how many were removed
    pub async fn revoke_principal(&self, principal_id: &str) -> Result<usize, EngineError> {
        let sessions = self.store.sessions_for(principal_id).await?;
        for session in &sessions {
            self.store.revoke(&session.session_id).await?;
        }
        counter!(SESSION_REVOKED).increment(sessions.len() as u64);
        info!(principal = principal_id, revoked = sessions.len(), "principal sessions revoked");
        Ok(sessions.len())
    }

    /// Remove expired and idle sessions. Meant to be driven by an external scheduler.
    pub async fn sweep_expired(&self) -> Result<usize, EngineError> {
        Ok(self.store.sweep_expired(self.clock.now()).await?)
    }

    /// Fetch a session, rejecting it once either deadline has passed
    async fn live(&self, session_id: &str) -> Result<Session, EngineError> {
        let session = self.store.get(session_id).await?;
        if session.is_expired(self.clock.now()) {
            return Err(AuthError::Expired.into());
        }
        Ok(session)
    }
}

fn grant(session: &Session) -> SessionGrant {
    SessionGrant {
        session_id: session.session_id.clone(),
        csrf_token: derive_token(&session.csrf_secret),
        absolute_expiry: session.absolute_expiry,
    }
}
