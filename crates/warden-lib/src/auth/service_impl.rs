use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;
use warden_common::{Claims, Principal};

use super::{AuthService, Credential, CredentialKind};
use crate::{
    clock::Clock,
    config::Settings,
    error::{AuthError, EngineError, IssueError},
    keys::KeyProvider,
    session::{LoginOptions, SessionAdapter, SessionEngine, SessionGrant, SessionPolicy, SessionStore, StoreOptions},
    token::{RevocationList, Token, TokenEngine},
};

/// Dispatches credentials to the token or session engine. Never retries.
pub struct Authenticator {
    tokens: TokenEngine,
    sessions: SessionEngine,
    clock_skew: Duration,
}

impl Authenticator {
    pub fn new(tokens: TokenEngine, sessions: SessionEngine, clock_skew: Duration) -> Self {
        Self {
            tokens,
            sessions,
            clock_skew,
        }
    }

    /// Wire both engines from settings over the given key provider and session backend
    pub fn from_settings(
        settings: &Settings,
        keys: Arc<dyn KeyProvider>,
        adapter: Arc<dyn SessionAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenEngine::new(keys, clock.clone()).with_max_token_bytes(settings.token.max_token_bytes);
        let store = SessionStore::new(adapter, clock.clone(), StoreOptions::from(&settings.session));
        let sessions = SessionEngine::new(Arc::new(store), clock, SessionPolicy::from(&settings.session));
        Self::new(tokens, sessions, settings.token.clock_skew())
    }

    pub fn with_revocation_list(mut self, list: Arc<dyn RevocationList>) -> Self {
        self.tokens = self.tokens.with_revocation_list(list);
        self
    }

    pub fn tokens(&self) -> &TokenEngine {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionEngine {
        &self.sessions
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn authenticate(&self, credential: Credential<'_>) -> Result<Principal, EngineError> {
        match credential.kind() {
            CredentialKind::Token => Ok(self.tokens.verify(credential.value, self.clock_skew)?),
            CredentialKind::Session => {
                self.sessions
                    .validate(credential.value, credential.csrf_token, credential.state_changing)
                    .await
            },
            CredentialKind::Unrecognized => {
                debug!(code = AuthError::Malformed.error_code(), "unrecognized credential");
                Err(AuthError::Malformed.into())
            },
        }
    }

    fn issue_token(&self, claims: Claims, kid: &str) -> Result<Token, IssueError> {
        self.tokens.issue(claims, kid)
    }

    async fn issue_session(&self, principal_id: &str, opts: LoginOptions) -> Result<SessionGrant, EngineError> {
        self.sessions.login(principal_id, opts).await
    }

    async fn logout(&self, session_id: &str) -> Result<(), EngineError> {
        self.sessions.logout(session_id).await
    }
}
