//! Adapter configuration.
//!
//! Credentials and the upstream base URL are read once at startup from the
//! process environment. Anything missing or malformed is a [`ConfigError`],
//! which callers treat as fatal.
//!
//! | variable | required |
//! |---|---|
//! | `GOOGLE_READER_EMAIL` | yes |
//! | `GOOGLE_READER_PASSWD` | no, falls back to the OS keychain |
//! | `GOOGLE_READER_BASE_URL` | yes |
//! | `GOOGLE_READER_TIMEOUT_SECS` | no, default 30 |
//! | `GOOGLE_READER_CLIENT` | no, default `greader-bridge` |

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;
use tracing::debug;

use crate::auth::CredentialStore;

pub const ENV_EMAIL: &str = "GOOGLE_READER_EMAIL";
pub const ENV_PASSWORD: &str = "GOOGLE_READER_PASSWD";
pub const ENV_BASE_URL: &str = "GOOGLE_READER_BASE_URL";
pub const ENV_TIMEOUT: &str = "GOOGLE_READER_TIMEOUT_SECS";
pub const ENV_CLIENT: &str = "GOOGLE_READER_CLIENT";

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Value sent as the `client` parameter on every request
pub const DEFAULT_CLIENT_NAME: &str = "greader-bridge";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Login identity for the upstream reader. Immutable once built.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Base URL without a trailing slash, e.g. `https://rss.example.net/api/greader.php`
    pub base_url: String,
    pub timeout: Duration,
    pub client_name: String,
}

impl Config {
    /// Build a config with default timeout and client name.
    pub fn new(credentials: Credentials, base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            credentials,
            base_url: normalize_base_url(base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from the process environment, falling back to the OS keychain
    /// for the password.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(
            |name| std::env::var(name).ok(),
            |email| match CredentialStore::get_password(email) {
                Ok(password) => Some(password),
                Err(e) => {
                    debug!(error = %e, "No password in keychain");
                    None
                }
            },
        )
    }

    /// Load from an arbitrary variable source. `password_fallback` is
    /// consulted with the login identifier when no password variable is set.
    pub fn from_lookup<F, P>(lookup: F, password_fallback: P) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
        P: FnOnce(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let email = get(ENV_EMAIL).ok_or(ConfigError::Missing(ENV_EMAIL))?;
        let base_url = get(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        // Passwords are taken as-is; surrounding spaces may be meaningful
        let password = lookup(ENV_PASSWORD)
            .filter(|v| !v.is_empty())
            .or_else(|| password_fallback(&email))
            .ok_or(ConfigError::Missing(ENV_PASSWORD))?;

        let mut config = Self::new(Credentials::new(email, password), &base_url)?;

        if let Some(raw) = get(ENV_TIMEOUT) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|&s| s > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: ENV_TIMEOUT,
                    value: raw,
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(client_name) = get(ENV_CLIENT) {
            config.client_name = client_name;
        }

        Ok(config)
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".to_string()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
