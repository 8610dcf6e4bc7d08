// ============================
// crates/warden-lib/src/session/mod.rs
// ============================
//! Server-side sessions.
pub mod adapter;
pub mod csrf;
mod engine;
mod locks;
mod store;
pub mod token_generator;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use warden_common::ClaimMap;

pub use adapter::{MemoryAdapter, SessionAdapter};
pub use csrf::CsrfSecret;
pub use engine::{LoginOptions, SessionEngine, SessionGrant, SessionPolicy};
pub use store::{SessionStore, StoreOptions};

/// Server-owned session record. Only `session_id` is ever handed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub principal_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Sliding deadline, never later than `absolute_expiry`
    pub idle_expiry: DateTime<Utc>,
    pub absolute_expiry: DateTime<Utc>,
    pub csrf_secret: CsrfSecret,
    pub data: ClaimMap,
}

impl Session {
    /// Past either the absolute ceiling or the sliding deadline
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.absolute_expiry || now > self.idle_expiry
    }

    /// Eligible for removal by the sweep
    pub fn is_stale(&self, now: DateTime<Utc>, max_idle: Duration) -> bool {
        now > self.absolute_expiry || now > saturating_add(self.last_seen_at, max_idle)
    }
}

/// `at + span`, pinned to the last representable instant when that overflows
pub(crate) fn saturating_add(at: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    at.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
