//! CSRF tokens bound to a session secret.
//!
//! A token is `b64(nonce) "." b64(hmac(secret, DOMAIN || nonce))`. Each call mints a fresh
//! nonce, so tokens are unique per request, and none of them reveals the secret.
use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use super::token_generator::{generate_csrf_secret, generate_nonce, CSRF_NONCE_BYTES};
use crate::signer::{mac, verify_mac};

/// Domain separation prefix so a CSRF tag can never double as any other MAC
const CSRF_DOMAIN: &[u8] = b"warden.csrf.v1:";

/// Per-session secret that CSRF tokens are derived from. Never leaves the server.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfSecret(Zeroizing<Vec<u8>>);

impl CsrfSecret {
    pub fn generate() -> Self {
        Self(generate_csrf_secret())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CsrfSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfSecret(**redacted**)")
    }
}

impl Serialize for CsrfSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(URL_SAFE_NO_PAD.encode(self.as_bytes()));
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for CsrfSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|_| de::Error::custom("csrf secret is not base64url"))?;
        Ok(Self(Zeroizing::new(bytes)))
    }
}

/// Mint a new CSRF token for `secret`
pub fn derive_token(secret: &CsrfSecret) -> String {
    token_for_nonce(secret, &generate_nonce())
}

/// Constant-time check that `presented` was derived from `secret`
pub fn verify_token(secret: &CsrfSecret, presented: &str) -> bool {
    let Some((nonce_b64, tag_b64)) = presented.split_once('.') else {
        return false;
    };
    let (Ok(nonce), Ok(tag)) = (URL_SAFE_NO_PAD.decode(nonce_b64), URL_SAFE_NO_PAD.decode(tag_b64)) else {
        return false;
    };
    if nonce.len() != CSRF_NONCE_BYTES {
        return false;
    }
    verify_mac(secret.as_bytes(), &message(&nonce), &tag)
}

fn token_for_nonce(secret: &CsrfSecret, nonce: &[u8]) -> String {
    let tag = mac(secret.as_bytes(), &message(nonce));
    let mut token = URL_SAFE_NO_PAD.encode(nonce);
    token.push('.');
    URL_SAFE_NO_PAD.encode_string(tag, &mut token);
    token
}

fn message(nonce: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(CSRF_DOMAIN.len() + nonce.len());
    message.extend_from_slice(CSRF_DOMAIN);
    message.extend_from_slice(nonce);
    message
}
