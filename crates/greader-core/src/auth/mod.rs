//! Authentication module for the upstream reader session.
//!
//! This module provides:
//! - `SessionManager`: owns the single cached token, logs in on demand and
//!   re-logs in when the translator reports expiry
//! - `CredentialStore`: OS keychain fallback for the password
//!
//! Tokens live only in process memory and are never written to disk.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{SessionManager, SessionToken};
