// ============================
// crates/warden-lib/src/session/store.rs
// ============================
//! Concurrency-safe session lifecycle storage over a pluggable adapter.
use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, warn};
use warden_common::ClaimMap;

use super::{
    adapter::SessionAdapter,
    locks::KeyLocks,
    saturating_add,
    token_generator::{fingerprint, generate_session_id},
    CsrfSecret, Session,
};
use crate::{
    clock::Clock,
    config::{SessionSettings, MAX_TTL_SECS},
    error::StoreError,
    metrics::SESSION_EXPIRED,
};

/// Attempts at finding an unused session id before giving up
const MAX_CREATE_ATTEMPTS: usize = 4;

/// Store tuning
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Idle period after which the sweep removes a session
    pub max_idle: chrono::Duration,
    /// Deadline for each adapter call
    pub adapter_timeout: Duration,
    /// Number of per-key lock stripes
    pub lock_stripes: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

impl From<&SessionSettings> for StoreOptions {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            max_idle: settings.max_idle(),
            adapter_timeout: settings.adapter_timeout(),
            lock_stripes: settings.lock_stripes,
        }
    }
}

/// Session records keyed by session id.
///
/// Every operation on one id runs under that id's stripe lock, so create/get/touch/revoke on
/// the same id observe a single order. The sweep never holds a lock across its scan.
pub struct SessionStore {
    adapter: Arc<dyn SessionAdapter>,
    clock: Arc<dyn Clock>,
    locks: KeyLocks,
    max_idle: chrono::Duration,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(adapter: Arc<dyn SessionAdapter>, clock: Arc<dyn Clock>, options: StoreOptions) -> Self {
        Self {
            adapter,
            clock,
            locks: KeyLocks::new(options.lock_stripes),
            max_idle: options.max_idle,
            timeout: options.adapter_timeout,
        }
    }

    /// Start a session for `principal_id` that can never outlive `absolute_ttl`.
    ///
    /// `absolute_ttl` is capped at [`MAX_TTL_SECS`].
    pub async fn create(&self, principal_id: &str, absolute_ttl: chrono::Duration) -> Result<Session, StoreError> {
        self.create_with_data(principal_id, absolute_ttl, ClaimMap::new()).await
    }

    pub async fn create_with_data(
        &self,
        principal_id: &str,
        absolute_ttl: chrono::Duration,
        data: ClaimMap,
    ) -> Result<Session, StoreError> {
        let now = self.clock.now();
        let absolute_ttl = absolute_ttl.min(chrono::Duration::seconds(MAX_TTL_SECS as i64));
        let absolute_expiry = saturating_add(now, absolute_ttl);
        let idle_expiry = saturating_add(now, self.max_idle).min(absolute_expiry);

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let session_id = generate_session_id();
            let _guard = self.locks.lock(&session_id).await;

            if self.call(self.adapter.get(&session_id)).await?.is_some() {
                warn!("session id collision, retrying");
                continue;
            }

            let session = Session {
                session_id,
                principal_id: principal_id.to_string(),
                created_at: now,
                last_seen_at: now,
                idle_expiry,
                absolute_expiry,
                csrf_secret: CsrfSecret::generate(),
                data,
            };
            self.write(&session, now).await?;
            return Ok(session);
        }

        Err(StoreError::Unavailable("could not allocate a unique session id".to_string()))
    }

    pub async fn get(&self, session_id: &str) -> Result<Session, StoreError> {
        let _guard = self.locks.lock(session_id).await;
        self.read(session_id).await
    }

    /// Record an access and slide the idle deadline, capped at the absolute expiry
    pub async fn touch(&self, session_id: &str, sliding_ttl: chrono::Duration) -> Result<Session, StoreError> {
        let _guard = self.locks.lock(session_id).await;
        let mut session = self.read(session_id).await?;
        let now = self.clock.now();

        // Never move backwards, never past the ceiling
        session.last_seen_at = session.last_seen_at.max(now.min(session.absolute_expiry));
        session.idle_expiry = saturating_add(session.last_seen_at, sliding_ttl).min(session.absolute_expiry);

        self.write(&session, now).await?;
        Ok(session)
    }

    /// Replace the session's data mapping
    pub async fn update_data(&self, session_id: &str, data: ClaimMap) -> Result<Session, StoreError> {
        let _guard = self.locks.lock(session_id).await;
        let mut session = self.read(session_id).await?;
        session.data = data;
        self.write(&session, self.clock.now()).await?;
        Ok(session)
    }

    /// Delete the record. Succeeds when it is already gone.
    pub async fn revoke(&self, session_id: &str) -> Result<(), StoreError> {
        let _guard = self.locks.lock(session_id).await;
        self.call(self.adapter.delete(session_id)).await
    }

    /// Every live session of one principal, from a scan snapshot
    pub async fn sessions_for(&self, principal_id: &str) -> Result<Vec<Session>, StoreError> {
        let snapshot = self.call(self.adapter.scan()).await?;
        Ok(snapshot
            .into_iter()
            .filter_map(|(key, bytes)| decode(&key, &bytes).ok())
            .filter(|session| session.principal_id == principal_id)
            .collect())
    }

    /// Remove every record past its absolute expiry or idle for longer than `max_idle`.
    ///
    /// Works from a snapshot and re-checks each candidate under its own lock, so a session
    /// touched after the snapshot was taken survives until the next sweep.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let snapshot = self.call(self.adapter.scan()).await?;
        let scanned = snapshot.len();
        let mut removed = 0;

        for (key, bytes) in snapshot {
            match decode(&key, &bytes) {
                Ok(session) if !session.is_stale(now, self.max_idle) => continue,
                Ok(_) => {},
                Err(_) => warn!(session = %fingerprint(&key), "removing unreadable session record"),
            }

            let _guard = self.locks.lock(&key).await;
            let still_stale = match self.read(&key).await {
                Ok(current) => current.is_stale(now, self.max_idle),
                Err(StoreError::NotFound) => false,
                Err(StoreError::Corrupt(_)) => true,
                Err(err) => return Err(err),
            };
            if still_stale {
                self.call(self.adapter.delete(&key)).await?;
                removed += 1;
            }
        }

        counter!(SESSION_EXPIRED).increment(removed as u64);
        info!(scanned, removed, "session sweep finished");
        Ok(removed)
    }

    async fn read(&self, session_id: &str) -> Result<Session, StoreError> {
        let bytes = self
            .call(self.adapter.get(session_id))
            .await?
            .ok_or(StoreError::NotFound)?;
        decode(session_id, &bytes)
    }

    async fn write(&self, session: &Session, now: DateTime<Utc>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(session).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        // Kept past the ceiling so late checks still see `Expired`; the sweep removes it
        let ttl = match (session.absolute_expiry - now).checked_add(&self.max_idle) {
            Some(ttl) => ttl.to_std().unwrap_or(Duration::ZERO),
            None => Duration::MAX,
        };
        self.call(self.adapter.put(&session.session_id, bytes, ttl)).await
    }

    /// Bound an adapter call by the configured deadline
    async fn call<T>(&self, fut: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                debug!(timeout = ?self.timeout, "session adapter call timed out");
                Err(StoreError::Timeout(self.timeout))
            },
        }
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<Session, StoreError> {
    let session: Session = serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if session.session_id != key {
        return Err(StoreError::Corrupt("record stored under a different id".to_string()));
    }
    Ok(session)
}
