//! Token revocation feed.
//!
//! The token engine only asks whether a `jti` is revoked; the denylist itself belongs to
//! whoever supplies it.
use std::time::Duration;

use dashmap::DashMap;

/// Answers whether a token id has been revoked
pub trait RevocationList: Send + Sync {
    fn is_revoked(&self, jti: &str) -> bool;
}

impl<F> RevocationList for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_revoked(&self, jti: &str) -> bool {
        self(jti)
    }
}

/// In-memory denylist keyed by `jti`.
///
/// Each entry remembers the revoked token's own expiry. Verification still accepts a token
/// for the allowed clock skew past `exp`, so an entry is only purged once that window has
/// closed too.
#[derive(Debug, Default)]
pub struct Denylist {
    entries: DashMap<String, i64>,
    grace_secs: i64,
}

impl Denylist {
    /// Denylist for verifiers that allow no clock skew
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep entries for `grace` past their expiry; pass the verifier's allowed skew
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            grace_secs: i64::try_from(grace.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Revoke `jti` until `until` (Unix seconds, normally the token's `exp`)
    pub fn revoke(&self, jti: impl Into<String>, until: i64) {
        self.entries
            .entry(jti.into())
            .and_modify(|existing| *existing = (*existing).max(until))
            .or_insert(until);
    }

    /// Drop entries whose tokens can no longer pass the expiry check. Returns how many were removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let grace = self.grace_secs;
        let before = self.entries.len();
        self.entries.retain(|_, until| until.saturating_add(grace) >= now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RevocationList for Denylist {
    fn is_revoked(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }
}
