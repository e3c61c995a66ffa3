use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The upstream rejected the session token. Consumed by the translator's
    /// reauthentication step and never handed to callers.
    #[error("Session expired - token rejected by upstream")]
    SessionExpired,

    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        let body = body.trim();
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a non-success response from an operation endpoint.
    ///
    /// 401 and the `X-Reader-Google-Bad-Token` marker both mean the session
    /// token is no longer accepted.
    pub fn from_status(status: reqwest::StatusCode, bad_token: bool, body: &str) -> Self {
        if bad_token || status == reqwest::StatusCode::UNAUTHORIZED {
            return ApiError::SessionExpired;
        }
        let message = Self::truncate_body(body);
        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            message
        };
        ApiError::Upstream {
            status: status.as_u16(),
            message,
        }
    }

    /// Classify a non-success response from the login endpoints, where a
    /// rejection means bad credentials rather than an expired session.
    pub fn from_login_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Authentication(Self::truncate_body(body)),
            _ => Self::from_status(status, false, body),
        }
    }

    /// Whether the caller may reasonably retry the whole operation later.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Upstream { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}
