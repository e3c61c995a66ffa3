use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::api::{ApiError, ReaderClient};
use crate::config::Credentials;

/// Token bundle issued by the upstream after a ClientLogin.
///
/// `auth` goes in the `Authorization: GoogleLogin` header, `sid` in a
/// cookie, and `action_token` (the protocol's `T`) as a request parameter.
#[derive(Clone)]
pub struct SessionToken {
    auth: String,
    sid: Option<String>,
    action_token: String,
    issued_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(auth: String, sid: Option<String>, action_token: String) -> Self {
        Self {
            auth,
            sid,
            action_token,
            issued_at: Utc::now(),
        }
    }

    pub fn authorization_header(&self) -> String {
        format!("GoogleLogin auth={}", self.auth)
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn action_token(&self) -> &str {
        &self.action_token
    }

    /// Time since the login that issued this token
    pub fn age(&self) -> Duration {
        Utc::now() - self.issued_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("has_sid", &self.sid.is_some())
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Owner of the process-wide session token.
///
/// The cache has two states, no-token and token-cached. The lock is held
/// across check-and-login so concurrent callers share a single login, but it
/// is never held while an operation's own request is in flight: callers get
/// an `Arc` snapshot of the token.
pub struct SessionManager {
    client: ReaderClient,
    credentials: Credentials,
    token: Mutex<Option<Arc<SessionToken>>>,
    logins: AtomicU64,
}

impl SessionManager {
    pub fn new(client: ReaderClient, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            token: Mutex::new(None),
            logins: AtomicU64::new(0),
        }
    }

    /// Return the cached token, logging in first if there is none.
    ///
    /// A rejected login surfaces as [`ApiError::Authentication`] and leaves
    /// the cache empty; it is never retried here.
    pub async fn ensure_token(&self) -> Result<Arc<SessionToken>, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            return Ok(Arc::clone(token));
        }
        self.login(&mut cached).await
    }

    /// Discard the cached token so the next [`ensure_token`](Self::ensure_token)
    /// logs in again.
    pub async fn invalidate(&self) {
        let mut cached = self.token.lock().await;
        if cached.take().is_some() {
            debug!("Session token discarded");
        }
    }

    /// Invalidate-and-reacquire as one step, for a caller whose request was
    /// rejected with `stale`.
    ///
    /// If the cache already holds a different token, another caller has
    /// refreshed in the meantime and that token is returned without a second
    /// login.
    pub async fn refresh(&self, stale: &Arc<SessionToken>) -> Result<Arc<SessionToken>, ApiError> {
        let mut cached = self.token.lock().await;
        let newer = cached
            .as_ref()
            .filter(|current| !Arc::ptr_eq(current, stale))
            .cloned();
        if let Some(current) = newer {
            debug!("Session already refreshed by another caller");
            return Ok(current);
        }
        if cached.take().is_some() {
            debug!("Session token discarded");
        }
        self.login(&mut cached).await
    }

    /// Whether a token is currently cached
    pub async fn is_authenticated(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Number of successful logins performed by this manager
    pub fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    pub fn client(&self) -> &ReaderClient {
        &self.client
    }

    async fn login(
        &self,
        cached: &mut MutexGuard<'_, Option<Arc<SessionToken>>>,
    ) -> Result<Arc<SessionToken>, ApiError> {
        let token = Arc::new(self.client.authenticate(&self.credentials).await?);
        let count = self.logins.fetch_add(1, Ordering::Relaxed) + 1;
        info!(user = self.credentials.email(), login_count = count, "Login successful");
        **cached = Some(Arc::clone(&token));
        Ok(token)
    }
}
