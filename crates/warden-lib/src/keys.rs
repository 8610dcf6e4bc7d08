//! Signing key material and the key-id indexed ring used for rotation.
//!
//! Keys are provisioned by an external key-management collaborator. The ring only stores
//! what it is handed; it never generates or persists keys.
use std::{collections::HashMap, fmt, sync::Arc};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::{config::KeySettings, error::KeyError, signer::Algorithm};

/// Minimum secret length (32 bytes = 256 bits for HMAC-SHA256)
pub const MIN_KEY_BYTES: usize = 32;

/// A single HMAC secret. Wiped on drop; `Debug` never prints it.
pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    secret: Zeroizing<Vec<u8>>,
}

impl SigningKey {
    pub fn new(kid: impl Into<String>, secret: Vec<u8>) -> Result<Self, KeyError> {
        let kid = kid.into();
        let secret = Zeroizing::new(secret);
        if secret.len() < MIN_KEY_BYTES {
            return Err(KeyError::TooShort {
                kid,
                len: secret.len(),
                min: MIN_KEY_BYTES,
            });
        }
        Ok(Self {
            kid,
            algorithm: Algorithm::Hs256,
            secret,
        })
    }

    /// Decode an unpadded base64url secret
    pub fn from_base64(kid: impl Into<String>, encoded: &str) -> Result<Self, KeyError> {
        let kid = kid.into();
        let secret = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| KeyError::InvalidEncoding(kid.clone()))?;
        Self::new(kid, secret)
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("secret", &"**redacted**")
            .finish()
    }
}

/// Source of signing keys by key id
pub trait KeyProvider: Send + Sync {
    fn key(&self, kid: &str) -> Option<Arc<SigningKey>>;
}

/// In-process key ring. Several keys may be valid at once so tokens signed with a key that
/// is being rotated out keep verifying until it is retired.
#[derive(Debug, Default)]
pub struct KeyRing {
    keys: RwLock<HashMap<String, Arc<SigningKey>>>,
    active: RwLock<Option<String>>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ring from configured base64url secrets
    pub fn from_settings(settings: &KeySettings) -> Result<Self, KeyError> {
        let ring = Self::new();
        for (kid, encoded) in &settings.secrets {
            ring.insert(SigningKey::from_base64(kid.clone(), encoded)?);
        }
        if let Some(active) = &settings.active {
            ring.set_active(active);
        }
        Ok(ring)
    }

    /// Add or replace a key. The first key inserted becomes active.
    pub fn insert(&self, key: SigningKey) {
        let kid = key.kid().to_string();
        self.keys.write().insert(kid.clone(), Arc::new(key));

        let mut active = self.active.write();
        if active.is_none() {
            *active = Some(kid);
        }
    }

    /// Stop accepting a key. Returns whether it was present.
    pub fn retire(&self, kid: &str) -> bool {
        let removed = self.keys.write().remove(kid).is_some();
        let mut active = self.active.write();
        if active.as_deref() == Some(kid) {
            *active = None;
        }
        removed
    }

    /// Select the key used for new tokens when the caller does not name one
    pub fn set_active(&self, kid: &str) -> bool {
        if !self.keys.read().contains_key(kid) {
            return false;
        }
        *self.active.write() = Some(kid.to_string());
        true
    }

    pub fn active(&self) -> Option<String> {
        self.active.read().clone()
    }

    pub fn kids(&self) -> Vec<String> {
        let mut kids: Vec<String> = self.keys.read().keys().cloned().collect();
        kids.sort();
        kids
    }
}

impl KeyProvider for KeyRing {
    fn key(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.read().get(kid).cloned()
    }
}
