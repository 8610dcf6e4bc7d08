//! Persistence adapter contract for session records, and the in-process implementation.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{clock::Clock, error::StoreError};

/// Key/value backend the session store runs on.
///
/// Implementations report transport problems as [`StoreError::Unavailable`]. A missing key is
/// `Ok(None)`, never an error. `ttl` is how long the backend must keep the value at minimum;
/// it may drop it afterwards.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch the value under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Snapshot of every live entry
    async fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// Sharded in-memory adapter. Honours TTLs against the injected clock.
pub struct MemoryAdapter {
    entries: DashMap<String, MemoryEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryAdapter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, including ones past their TTL that were not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl SessionAdapter for MemoryAdapter {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expiry_after(self.clock.now(), ttl);
        self.entries
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = self.clock.now();
        let value = match self.entries.get(key) {
            Some(entry) if now <= entry.expires_at => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // Lazily evict; a concurrent put may have refreshed it in the meantime
        self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let now = self.clock.now();
        // Entries nobody reads again are only ever dropped here
        self.entries.retain(|_, entry| now <= entry.expires_at);
        Ok(self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value.clone()))
            .collect())
    }
}
