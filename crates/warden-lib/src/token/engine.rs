//! Issue and verify stateless tokens.
//!
//! Framing: `b64(header) "." b64(claims) "." b64(tag)`, unpadded base64url, where the tag is
//! HMAC-SHA256 over the first two segments exactly as transmitted.
use std::{fmt, sync::Arc, time::Duration};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use warden_common::{AuthMethod, Claims, Principal, ISSUED_AT, TOKEN_ID};

use crate::{
    clock::Clock,
    codec,
    error::{AuthError, IssueError},
    keys::KeyProvider,
    metrics::{REASON, TOKEN_ISSUED, TOKEN_REJECTED, TOKEN_VERIFIED},
    signer::{self, Algorithm},
};

use super::RevocationList;

/// `typ` header value for tokens produced here
pub const TOKEN_TYPE: &str = "WDT";

/// Tokens longer than this are rejected before any decoding
pub const DEFAULT_MAX_TOKEN_BYTES: usize = 8 * 1024;

/// Token header. Field order is fixed, so the encoded header is canonical too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenHeader {
    pub alg: Algorithm,
    pub kid: String,
    pub typ: String,
}

/// An issued token. Immutable; validity is re-derived from the encoded string on every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    header: TokenHeader,
    claims: Claims,
    encoded: String,
}

impl Token {
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Claims as signed, including the `iat` and `jti` filled in at issuance
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Stateless token issuer and verifier
#[derive(Clone)]
pub struct TokenEngine {
    keys: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
    revocations: Option<Arc<dyn RevocationList>>,
    max_token_bytes: usize,
}

impl TokenEngine {
    pub fn new(keys: Arc<dyn KeyProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys,
            clock,
            revocations: None,
            max_token_bytes: DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    /// Check `jti` claims against a revocation feed. Without one, tokens only die by expiry.
    pub fn with_revocation_list(mut self, list: Arc<dyn RevocationList>) -> Self {
        self.revocations = Some(list);
        self
    }

    pub fn with_max_token_bytes(mut self, max: usize) -> Self {
        self.max_token_bytes = max;
        self
    }

    /// Sign `claims` with the key registered as `kid`.
    ///
    /// The caller supplies `sub` and `exp`; `iat` is always overwritten with the current time
    /// and a random `jti` is added when absent.
    pub fn issue(&self, mut claims: Claims, kid: &str) -> Result<Token, IssueError> {
        let key = self
            .keys
            .key(kid)
            .ok_or_else(|| IssueError::UnknownKey(kid.to_string()))?;

        if claims.expires_at().is_none() {
            return Err(IssueError::InvalidClaims);
        }
        claims.insert(ISSUED_AT, self.clock.unix_seconds());
        if !claims.contains(TOKEN_ID) {
            claims.insert(TOKEN_ID, Uuid::new_v4().to_string());
        }

        let payload = codec::encode(&claims).map_err(|_| IssueError::InvalidClaims)?;
        let header = TokenHeader {
            alg: key.algorithm(),
            kid: key.kid().to_string(),
            typ: TOKEN_TYPE.to_string(),
        };
        let header_json = serde_json::to_vec(&header).map_err(|_| IssueError::InvalidClaims)?;

        let mut encoded = URL_SAFE_NO_PAD.encode(header_json);
        encoded.push('.');
        URL_SAFE_NO_PAD.encode_string(payload, &mut encoded);
        let tag = signer::sign(&key, encoded.as_bytes());
        encoded.push('.');
        URL_SAFE_NO_PAD.encode_string(tag, &mut encoded);

        counter!(TOKEN_ISSUED).increment(1);
        debug!(kid = %header.kid, "issued token");

        Ok(Token {
            header,
            claims,
            encoded,
        })
    }

    /// Verify a token and return the principal it names.
    ///
    /// `allowed_skew` widens both the expiry and the not-before-issuance checks.
    pub fn verify(&self, token: &str, allowed_skew: Duration) -> Result<Principal, AuthError> {
        let result = self.check(token, allowed_skew);
        match &result {
            Ok(_) => counter!(TOKEN_VERIFIED).increment(1),
            Err(err) => {
                counter!(TOKEN_REJECTED, REASON => err.error_code()).increment(1);
                if err.is_security_event() {
                    warn!(code = err.error_code(), "token rejected");
                } else {
                    debug!(code = err.error_code(), "token rejected");
                }
            },
        }
        result
    }

    fn check(&self, token: &str, allowed_skew: Duration) -> Result<Principal, AuthError> {
        if token.len() > self.max_token_bytes {
            return Err(AuthError::Malformed);
        }

        // 1. Shape
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(tag_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed);
        };
        if header_b64.is_empty() || payload_b64.is_empty() || tag_b64.is_empty() {
            return Err(AuthError::Malformed);
        }

        // 2. Header and key lookup
        let header_json = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| AuthError::Malformed)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_json).map_err(|_| AuthError::Malformed)?;
        if header.typ != TOKEN_TYPE {
            return Err(AuthError::Malformed);
        }
        let key = self.keys.key(&header.kid).ok_or(AuthError::SignatureInvalid)?;
        if key.algorithm() != header.alg {
            return Err(AuthError::SignatureInvalid);
        }

        // 3. Signature over the segments as received
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| AuthError::SignatureInvalid)?;
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        if !signer::verify(&key, signing_input.as_bytes(), &tag) {
            return Err(AuthError::SignatureInvalid);
        }

        // 4. Payload
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed)?;
        let claims = codec::decode(&payload)?;
        let (Some(iat), Some(exp)) = (claims.issued_at(), claims.expires_at()) else {
            return Err(AuthError::Malformed);
        };

        // 5, 6. Time
        let now = self.clock.unix_seconds();
        let skew = i64::try_from(allowed_skew.as_secs()).unwrap_or(i64::MAX);
        if now > exp.saturating_add(skew) {
            return Err(AuthError::Expired);
        }
        if now < iat.saturating_sub(skew) {
            return Err(AuthError::ClockSkew);
        }

        // 7. Revocation
        if let (Some(list), Some(jti)) = (&self.revocations, claims.token_id()) {
            if list.is_revoked(jti) {
                return Err(AuthError::Revoked);
            }
        }

        let id = claims.subject().ok_or(AuthError::Malformed)?.to_string();
        Ok(Principal {
            id,
            claims: claims.into_map(),
            auth_method: AuthMethod::Token,
        })
    }
}
