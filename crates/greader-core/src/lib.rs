//! Adapter between a logical-operation dispatcher and a Google Reader
//! compatible feed service (FreshRSS and friends).
//!
//! - [`auth`]: the session manager that owns the single upstream token
//! - [`operations`]: the operation set and the [`Translator`] that maps each
//!   operation to one upstream call with a one-shot reauthentication retry
//! - [`api`]: HTTP plumbing and error classification
//! - [`models`]: normalized result records
//! - [`config`]: environment-driven configuration
//!
//! ```rust,ignore
//! let config = Config::from_env()?;
//! let translator = Translator::from_config(&config)?;
//! let op = Operation::decode("list-unread-items", serde_json::json!({"feed": "42"}))?;
//! let result = translator.execute(op).await;
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod operations;
pub mod utils;

pub use api::ApiError;
pub use auth::{SessionManager, SessionToken};
pub use config::{Config, ConfigError, Credentials};
pub use operations::{ErrorDescriptor, ErrorKind, Operation, OperationResult, Payload, Translator};
