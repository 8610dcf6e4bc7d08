// ============================
// crates/warden-lib/src/lib.rs
// ============================
//! Credential verification and session management engine.
//!
//! Transport layers hand credentials to [`AuthService::authenticate`] and get back a
//! [`Principal`](warden_common::Principal) or a typed failure.

pub mod auth;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod session;
pub mod signer;
pub mod token;

use std::sync::Arc;

pub use crate::auth::{AuthService, Authenticator, Credential, CredentialKind};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::error::{AuthError, EngineError, IssueError, KeyError, StoreError};

use crate::config::Settings;
use crate::keys::KeyRing;
use crate::session::{MemoryAdapter, SessionAdapter};
use crate::token::Denylist;

/// Fully wired engine shared by the calling layer
#[derive(Clone)]
pub struct Warden {
    /// Verification entry point
    pub auth: Arc<Authenticator>,
    /// Signing keys, open to runtime rotation
    pub keys: Arc<KeyRing>,
    /// `jti` denylist consulted by token verification
    pub denylist: Arc<Denylist>,
    /// Settings the engine was built from, with the key secrets wiped
    pub settings: Arc<Settings>,
}

impl Warden {
    /// Build the engine over a session backend and time source
    pub fn new(mut settings: Settings, adapter: Arc<dyn SessionAdapter>, clock: Arc<dyn Clock>) -> Result<Self, KeyError> {
        let keys = KeyRing::from_settings(&settings.keys);
        settings.keys.clear_secrets();
        let keys = Arc::new(keys?);
        let denylist = Arc::new(Denylist::with_grace(settings.token.clock_skew()));
        let auth = Authenticator::from_settings(&settings, keys.clone(), adapter, clock)
            .with_revocation_list(denylist.clone());

        Ok(Self {
            auth: Arc::new(auth),
            keys,
            denylist,
            settings: Arc::new(settings),
        })
    }

    /// Engine with in-process session storage and the wall clock
    pub fn in_memory(settings: Settings) -> Result<Self, KeyError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let adapter = Arc::new(MemoryAdapter::new(clock.clone()));
        Self::new(settings, adapter, clock)
    }

    /// Key id used for new tokens
    pub fn active_kid(&self) -> Option<String> {
        self.keys.active()
    }
}
