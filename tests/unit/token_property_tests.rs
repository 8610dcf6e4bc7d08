use std::time::Duration;

use warden_lib::{
    keys::{KeyRing, SigningKey},
    token::TokenEngine,
    AuthError, Clock, ManualClock,
};
use std::sync::Arc;

use crate::test_utils::{claims_for, START};

const SKEW: Duration = Duration::from_secs(30);

fn engine() -> (TokenEngine, Arc<KeyRing>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_unix(START));
    let ring = Arc::new(KeyRing::new());
    ring.insert(SigningKey::new("k1", vec![1; 32]).unwrap());
    (TokenEngine::new(ring.clone(), clock.clone()), ring, clock)
}

/// Replace the byte at `index` with another character of the base64url alphabet
fn flip(token: &str, index: usize) -> String {
    let mut bytes = token.as_bytes().to_vec();
    bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_any_single_byte_flip_in_payload_or_signature_is_rejected() {
    let (engine, _, clock) = engine();
    let claims = claims_for(&clock, "u1", 3600).with("role", "reader");
    let token = engine.issue(claims, "k1").unwrap().into_string();
    let header_end = token.find('.').unwrap();

    for index in header_end + 1..token.len() {
        if token.as_bytes()[index] == b'.' {
            continue;
        }
        assert_eq!(
            engine.verify(&flip(&token, index), SKEW),
            Err(AuthError::SignatureInvalid),
            "byte {index} accepted after flip"
        );
    }
}

#[test]
fn test_expiry_boundaries() {
    let (engine, _, clock) = engine();

    // Already past expiry with no tolerance
    let token = engine.issue(claims_for(&clock, "u1", 60), "k1").unwrap();
    clock.advance_secs(61);
    assert_eq!(engine.verify(token.as_str(), Duration::ZERO), Err(AuthError::Expired));

    // Inside the skew window
    assert!(engine.verify(token.as_str(), SKEW).is_ok());

    // Beyond it
    clock.advance_secs(SKEW.as_secs() as i64);
    assert_eq!(engine.verify(token.as_str(), SKEW), Err(AuthError::Expired));
}

#[test]
fn test_token_from_the_future() {
    let (engine, _, clock) = engine();
    let token = engine.issue(claims_for(&clock, "u1", 3600), "k1").unwrap();

    clock.advance_secs(-(SKEW.as_secs() as i64));
    assert!(engine.verify(token.as_str(), SKEW).is_ok());
    clock.advance_secs(-1);
    assert_eq!(engine.verify(token.as_str(), SKEW), Err(AuthError::ClockSkew));
}

#[test]
fn test_zero_downtime_rotation() {
    let (engine, ring, clock) = engine();
    let old = engine.issue(claims_for(&clock, "u1", 3600), "k1").unwrap();

    ring.insert(SigningKey::new("k2", vec![2; 32]).unwrap());
    assert!(ring.set_active("k2"));
    let new = engine.issue(claims_for(&clock, "u1", 3600), "k2").unwrap();

    // Both verify while k1 is still provisioned
    assert!(engine.verify(old.as_str(), SKEW).is_ok());
    assert!(engine.verify(new.as_str(), SKEW).is_ok());

    assert!(ring.retire("k1"));
    assert_eq!(engine.verify(old.as_str(), SKEW), Err(AuthError::SignatureInvalid));
    assert!(engine.verify(new.as_str(), SKEW).is_ok());
}

#[test]
fn test_each_issue_is_unique() {
    let (engine, _, clock) = engine();
    let a = engine.issue(claims_for(&clock, "u1", 3600), "k1").unwrap();
    let b = engine.issue(claims_for(&clock, "u1", 3600), "k1").unwrap();
    assert_ne!(a.claims().token_id(), b.claims().token_id());
    assert_ne!(a.as_str(), b.as_str());
    assert_eq!(a.claims().issued_at(), Some(clock.unix_seconds()));
}
