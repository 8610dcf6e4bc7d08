// ============================
// crates/warden-lib/src/auth/mod.rs
// ============================
//! Unified credential verification.

pub mod credential;
mod service;
mod service_impl;

pub use credential::{classify, Credential, CredentialKind};
pub use service::AuthService;
pub use service_impl::Authenticator;
