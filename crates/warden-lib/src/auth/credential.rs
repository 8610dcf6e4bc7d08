//! Incoming credentials and their structural classification.
use std::fmt;

use crate::session::token_generator::{fingerprint, is_session_id};

/// Which engine a credential belongs to, decided from its shape alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// `header.payload.signature`
    Token,
    /// Opaque session identifier
    Session,
    /// Neither shape
    Unrecognized,
}

/// Classify without attempting verification against either engine
pub fn classify(value: &str) -> CredentialKind {
    if value.bytes().filter(|&b| b == b'.').count() == 2 {
        CredentialKind::Token
    } else if is_session_id(value) {
        CredentialKind::Session
    } else {
        CredentialKind::Unrecognized
    }
}

/// A credential as extracted by the transport layer
#[derive(Clone, Copy)]
pub struct Credential<'a> {
    pub value: &'a str,
    /// CSRF token sent alongside a session id
    pub csrf_token: Option<&'a str>,
    /// Set for requests that change state; makes the CSRF token mandatory for sessions
    pub state_changing: bool,
}

impl<'a> Credential<'a> {
    pub fn new(value: &'a str) -> Self {
        Self {
            value,
            csrf_token: None,
            state_changing: false,
        }
    }

    pub fn with_csrf(mut self, csrf_token: &'a str) -> Self {
        self.csrf_token = Some(csrf_token);
        self
    }

    pub fn state_changing(mut self) -> Self {
        self.state_changing = true;
        self
    }

    pub fn kind(&self) -> CredentialKind {
        classify(self.value)
    }
}

impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Credential");
        out.field("kind", &self.kind());
        if self.kind() == CredentialKind::Session {
            out.field("session", &fingerprint(self.value));
        }
        out.field("csrf_token", &self.csrf_token.map(|_| "**redacted**"))
            .field("state_changing", &self.state_changing)
            .finish()
    }
}
