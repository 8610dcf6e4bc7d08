// ============================
// crates/warden-lib/src/session/token_generator.rs
// ============================
/** Random values for server-side sessions
Session identifiers, CSRF secrets and CSRF nonces all come from the thread-local CSPRNG
and are exposed as unpadded base64url strings. */
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Session id size in bytes (32 bytes = 256 bits of entropy)
pub const SESSION_ID_BYTES: usize = 32;

/// Encoded length of a session id: 32 bytes in unpadded base64 is 43 characters
pub const SESSION_ID_LEN: usize = 43;

/// CSRF secret size in bytes
pub const CSRF_SECRET_BYTES: usize = 32;

/// Per-token CSRF nonce size in bytes
pub const CSRF_NONCE_BYTES: usize = 16;

/** Generate a new opaque session identifier
# Returns
A 43 character base64 URL-safe string without padding */
pub fn generate_session_id() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<SESSION_ID_BYTES>())
}

/// Fresh CSRF secret, wiped when dropped
pub fn generate_csrf_secret() -> Zeroizing<Vec<u8>> {
    Zeroizing::new(random_bytes::<CSRF_SECRET_BYTES>().to_vec())
}

pub fn generate_nonce() -> [u8; CSRF_NONCE_BYTES] {
    random_bytes::<CSRF_NONCE_BYTES>()
}

/** Whether `value` has the exact shape of an id produced by [`generate_session_id`]
This is purely structural; it says nothing about whether such a session exists. */
pub fn is_session_id(value: &str) -> bool {
    value.len() == SESSION_ID_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Short non-reversible label for a session id, safe to put in logs
pub fn fingerprint(session_id: &str) -> String {
    let digest = Sha256::digest(session_id.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buffer = [0u8; N];
    rand::rng().fill_bytes(&mut buffer);
    buffer
}
