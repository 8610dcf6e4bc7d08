//! Keyed integrity protection: HMAC-SHA256 tags with constant-time verification.
use hmac::{
    digest::{Key, KeyInit},
    Hmac, Mac,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::keys::SigningKey;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes
pub const TAG_LEN: usize = 32;

pub type Tag = [u8; TAG_LEN];

/// Signing algorithm identifiers carried in token headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "HS256")]
    Hs256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Hs256 => "HS256",
        }
    }
}

/// Tag `message` with a registered signing key
pub fn sign(key: &SigningKey, message: &[u8]) -> Tag {
    mac(key.secret(), message)
}

/// Check `tag` against `message` without short-circuiting on the first differing byte
pub fn verify(key: &SigningKey, message: &[u8], tag: &[u8]) -> bool {
    verify_mac(key.secret(), message, tag)
}

/// Raw HMAC over `message` with an arbitrary secret
pub(crate) fn mac(secret: &[u8], message: &[u8]) -> Tag {
    let mut key = block_key(secret);
    let mut mac = <HmacSha256 as KeyInit>::new(&key);
    key.as_mut_slice().zeroize();
    mac.update(message);
    let digest = mac.finalize().into_bytes();

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest);
    tag
}

/// Fit `secret` to one block: zero-padded, or hashed first when longer than a block
fn block_key(secret: &[u8]) -> Key<HmacSha256> {
    let mut key = Key::<HmacSha256>::default();
    if secret.len() > key.len() {
        let digest = Sha256::digest(secret);
        key[..digest.len()].copy_from_slice(&digest);
    } else {
        key[..secret.len()].copy_from_slice(secret);
    }
    key
}

pub(crate) fn verify_mac(secret: &[u8], message: &[u8], tag: &[u8]) -> bool {
    let expected = mac(secret, message);
    expected[..].ct_eq(tag).into()
}
