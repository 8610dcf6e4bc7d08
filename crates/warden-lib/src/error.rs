// crates/warden-lib/src/error.rs

//! Error taxonomy for credential verification and session storage.
use std::time::Duration;
use thiserror::Error;

/// Verification failure tags.
///
/// Carries no detail beyond the tag: never raw payload bytes, key ids, or session ids.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthError {
    #[error("malformed credential")]
    Malformed,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("credential expired")]
    Expired,

    #[error("credential revoked")]
    Revoked,

    #[error("session not found")]
    NotFound,

    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("credential issued in the future")]
    ClockSkew,
}

impl AuthError {
    /// Stable code for logs and metric labels
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Malformed => "AUTH_MALFORMED",
            AuthError::SignatureInvalid => "AUTH_SIGNATURE",
            AuthError::Expired => "AUTH_EXPIRED",
            AuthError::Revoked => "AUTH_REVOKED",
            AuthError::NotFound => "AUTH_NOT_FOUND",
            AuthError::CsrfMismatch => "AUTH_CSRF",
            AuthError::ClockSkew => "AUTH_CLOCK_SKEW",
        }
    }

    /// Message safe to echo to the credential presenter. Identical for every variant.
    pub fn sanitized_message(&self) -> &'static str {
        "Authentication failed"
    }

    /// Failures that indicate tampering or forgery rather than ordinary staleness
    pub fn is_security_event(&self) -> bool {
        matches!(self, AuthError::SignatureInvalid | AuthError::CsrfMismatch)
    }
}

/// Outcome of a session storage call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("session not found")]
    NotFound,

    #[error("persistence adapter timed out after {0:?}")]
    Timeout(Duration),

    #[error("persistence adapter unavailable: {0}")]
    Unavailable(String),

    #[error("stored session record is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether the caller may retry with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout(_) | StoreError::Unavailable(_))
    }
}

/// Error returned by operations that may touch session storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => EngineError::Auth(AuthError::NotFound),
            other => EngineError::Store(other),
        }
    }
}

impl EngineError {
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Auth(e) => e.error_code(),
            EngineError::Store(StoreError::Timeout(_)) => "STORE_TIMEOUT",
            EngineError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
            EngineError::Store(StoreError::Corrupt(_)) => "STORE_CORRUPT",
            EngineError::Store(StoreError::NotFound) => AuthError::NotFound.error_code(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Auth(_) => false,
            EngineError::Store(e) => e.is_transient(),
        }
    }

    /// The verification failure, if this is one
    pub fn auth(&self) -> Option<AuthError> {
        match self {
            EngineError::Auth(e) => Some(*e),
            EngineError::Store(StoreError::NotFound) => Some(AuthError::NotFound),
            EngineError::Store(_) => None,
        }
    }

    /// Message suitable for the system boundary
    pub fn sanitized_message(&self) -> &'static str {
        if self.is_transient() {
            "Service temporarily unavailable"
        } else {
            "Authentication failed"
        }
    }
}

/// Token issuance failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("no signing key registered under id `{0}`")]
    UnknownKey(String),

    #[error("claims cannot be encoded")]
    InvalidClaims,
}

/// Key provisioning failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("signing key `{kid}` is {len} bytes, at least {min} required")]
    TooShort { kid: String, len: usize, min: usize },

    #[error("signing key `{0}` is not valid base64url")]
    InvalidEncoding(String),
}
