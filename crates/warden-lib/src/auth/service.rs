use async_trait::async_trait;
use warden_common::{Claims, Principal};

use super::Credential;
use crate::error::{EngineError, IssueError};
use crate::session::{LoginOptions, SessionGrant};
use crate::token::Token;

/// Single verification entry point for transport layers
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify a credential of either kind
    async fn authenticate(&self, credential: Credential<'_>) -> Result<Principal, EngineError>;
    fn issue_token(&self, claims: Claims, kid: &str) -> Result<Token, IssueError>;
    async fn issue_session(&self, principal_id: &str, opts: LoginOptions) -> Result<SessionGrant, EngineError>;
    async fn logout(&self, session_id: &str) -> Result<(), EngineError>;
}
