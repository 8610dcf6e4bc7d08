// ==============
// crates/warden-lib/src/metrics.rs

//! Central place for metric keys. The engine records through the `metrics` facade and never
//! installs a recorder itself.
pub const TOKEN_ISSUED: &str = "token.issued";
pub const TOKEN_VERIFIED: &str = "token.verified";
pub const TOKEN_REJECTED: &str = "token.rejected";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_VALIDATED: &str = "session.validated";
pub const SESSION_REJECTED: &str = "session.rejected";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const SESSION_EXPIRED: &str = "session.expired";

/// Label carrying an error code on rejection counters
pub const REASON: &str = "reason";
