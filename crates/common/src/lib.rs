// ================
// common/src/lib.rs
// ================
//! Common types shared between the `warden` engine and the layers that call into it.
//! This module defines the claim data model and the verified principal handed back to callers.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Reserved claim: subject identifier
pub const SUBJECT: &str = "sub";
/// Reserved claim: issued-at, Unix seconds
pub const ISSUED_AT: &str = "iat";
/// Reserved claim: expiry, Unix seconds
pub const EXPIRES_AT: &str = "exp";
/// Optional claim: token identifier used for revocation
pub const TOKEN_ID: &str = "jti";

/// Ordered claim mapping. `BTreeMap` keeps keys sorted so iteration order is stable.
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A single claim value
/// # Variants
/// * `Str` - UTF-8 string
/// * `Int` - signed 64-bit integer
/// * `Map` - nested claim mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Str(String),
    Int(i64),
    Map(ClaimMap),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ClaimValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ClaimMap> {
        match self {
            ClaimValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Str(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Str(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Int(value)
    }
}

impl From<ClaimMap> for ClaimValue {
    fn from(value: ClaimMap) -> Self {
        ClaimValue::Map(value)
    }
}

impl<'de> Deserialize<'de> for ClaimValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ClaimValueVisitor)
    }
}

struct ClaimValueVisitor;

impl<'de> Visitor<'de> for ClaimValueVisitor {
    type Value = ClaimValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, a signed 64-bit integer, or a map of claims")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ClaimValue::Str(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ClaimValue::Str(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ClaimValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(ClaimValue::Int)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
        visit_claim_map(access).map(ClaimValue::Map)
    }
}

/// Collect a map, failing on the first repeated key instead of silently keeping the last one.
fn visit_claim_map<'de, A: MapAccess<'de>>(mut access: A) -> Result<ClaimMap, A::Error> {
    let mut map = ClaimMap::new();
    while let Some(key) = access.next_key::<String>()? {
        if map.contains_key(&key) {
            return Err(de::Error::custom(format_args!("duplicate claim `{key}`")));
        }
        let value = access.next_value::<ClaimValue>()?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Claims asserted about a principal.
///
/// Reserved claims (`sub`, `iat`, `exp`) are ordinary entries; their presence and types are
/// enforced by the engine's codec, not by this container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Claims(ClaimMap);

impl Claims {
    /// Claims for `subject` expiring at `expires_at` (Unix seconds). `iat` is set at issuance.
    pub fn new(subject: impl Into<String>, expires_at: i64) -> Self {
        let mut map = ClaimMap::new();
        map.insert(SUBJECT.to_string(), ClaimValue::Str(subject.into()));
        map.insert(EXPIRES_AT.to_string(), ClaimValue::Int(expires_at));
        Self(map)
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Option<ClaimValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<ClaimValue> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get(SUBJECT).and_then(ClaimValue::as_str)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.get(ISSUED_AT).and_then(ClaimValue::as_int)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.get(EXPIRES_AT).and_then(ClaimValue::as_int)
    }

    pub fn token_id(&self) -> Option<&str> {
        self.get(TOKEN_ID).and_then(ClaimValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &ClaimMap {
        &self.0
    }

    pub fn into_map(self) -> ClaimMap {
        self.0
    }
}

impl From<ClaimMap> for Claims {
    fn from(map: ClaimMap) -> Self {
        Self(map)
    }
}

impl<'de> Deserialize<'de> for Claims {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClaimsVisitor;

        impl<'de> Visitor<'de> for ClaimsVisitor {
            type Value = Claims;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a claims object")
            }

            fn visit_map<A: MapAccess<'de>>(self, access: A) -> Result<Self::Value, A::Error> {
                visit_claim_map(access).map(Claims)
            }
        }

        deserializer.deserialize_map(ClaimsVisitor)
    }
}

/// How a principal was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Stateless signed token
    Token,
    /// Server-side session
    Session,
}

/// Verified identity produced by one successful authentication check.
/// Constructed fresh per call and never persisted.
/// # Fields
/// * `id` - token subject or session principal id
/// * `claims` - token claims, or the session's data mapping
/// * `auth_method` - which credential kind produced this principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub claims: ClaimMap,
    pub auth_method: AuthMethod,
}
