//! Canonical claim encoding.
//!
//! Claims are written as compact JSON with keys sorted by byte order at every nesting level
//! (a property of `ClaimMap` being a `BTreeMap`). Two encodings of equal claims are therefore
//! byte-identical, which is what lets the signer's tag be recomputed on verification.
use warden_common::{ClaimValue, Claims, EXPIRES_AT, ISSUED_AT, SUBJECT};

use crate::error::AuthError;

/// Encode claims after checking the reserved ones
pub fn encode(claims: &Claims) -> Result<Vec<u8>, AuthError> {
    check_reserved(claims)?;
    serde_json::to_vec(claims).map_err(|_| AuthError::Malformed)
}

/// Decode bytes produced by [`encode`].
///
/// Fails on truncation, trailing data, duplicate keys, unsupported value types, or missing
/// reserved claims.
pub fn decode(bytes: &[u8]) -> Result<Claims, AuthError> {
    let claims: Claims = serde_json::from_slice(bytes).map_err(|_| AuthError::Malformed)?;
    check_reserved(&claims)?;
    Ok(claims)
}

fn check_reserved(claims: &Claims) -> Result<(), AuthError> {
    match claims.get(SUBJECT) {
        Some(ClaimValue::Str(sub)) if !sub.is_empty() => {},
        _ => return Err(AuthError::Malformed),
    }
    let (Some(iat), Some(exp)) = (int_claim(claims, ISSUED_AT), int_claim(claims, EXPIRES_AT)) else {
        return Err(AuthError::Malformed);
    };
    if exp <= iat {
        return Err(AuthError::Malformed);
    }
    Ok(())
}

fn int_claim(claims: &Claims, name: &str) -> Option<i64> {
    match claims.get(name) {
        Some(ClaimValue::Int(v)) => Some(*v),
        _ => None,
    }
}
