//! Stateless signed tokens.
mod engine;
pub mod revocation;

pub use engine::{Token, TokenEngine, TokenHeader, DEFAULT_MAX_TOKEN_BYTES, TOKEN_TYPE};
pub use revocation::{Denylist, RevocationList};
