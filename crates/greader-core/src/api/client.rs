//! HTTP client for the upstream Google Reader API.
//!
//! `ReaderClient` knows how to log in (ClientLogin + action token) and how
//! to send an [`UpstreamRequest`] with a given [`SessionToken`]. It does not
//! cache tokens or retry; that is the job of the session manager and the
//! operation translator.

use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::SessionToken;
use crate::config::{Config, Credentials};

use super::request::{UpstreamRequest, API_PREFIX};
use super::ApiError;

/// Response header FreshRSS sets when the `T` action token is rejected
const BAD_TOKEN_HEADER: &str = "X-Reader-Google-Bad-Token";

/// Body a write endpoint answers with on success
const OK_BODY: &str = "OK";

/// Successful upstream response body.
#[derive(Debug, Clone)]
pub struct UpstreamBody {
    pub text: String,
}

impl UpstreamBody {
    pub fn json<T: DeserializeOwned>(&self, what: &str) -> Result<T, ApiError> {
        serde_json::from_str(&self.text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }
}

/// API client for a Google Reader compatible server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ReaderClient {
    client: Client,
    base_url: String,
    client_name: String,
}

impl ReaderClient {
    /// Create a new client for the configured server
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            client_name: config.client_name.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path.trim_start_matches('/'))
    }

    /// Log in with ClientLogin and fetch the action token.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken, ApiError> {
        let url = format!("{}/accounts/ClientLogin", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&[
                ("Email", credentials.email()),
                ("Passwd", credentials.password()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Login rejected by upstream");
            return Err(ApiError::from_login_status(status, &body));
        }

        let (auth, sid) = parse_client_login(&body).ok_or_else(|| {
            ApiError::Authentication("Login response did not contain an Auth token".to_string())
        })?;

        let action_token = self.fetch_action_token(&auth).await?;

        Ok(SessionToken::new(auth, sid, action_token))
    }

    /// Fetch the short-lived `T` token required by write endpoints
    async fn fetch_action_token(&self, auth: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.api_url("token"))
            .header(header::AUTHORIZATION, format!("GoogleLogin auth={}", auth))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Action token request rejected");
            return Err(ApiError::from_login_status(status, &body));
        }

        let token = body.trim();
        if token.is_empty() {
            return Err(ApiError::Authentication(
                "Upstream returned an empty action token".to_string(),
            ));
        }
        Ok(token.to_string())
    }

    /// Send one request with the given token.
    ///
    /// An expired token comes back as [`ApiError::SessionExpired`]; the
    /// caller decides whether to reauthenticate.
    pub async fn send(
        &self,
        token: &SessionToken,
        request: &UpstreamRequest,
    ) -> Result<UpstreamBody, ApiError> {
        let url = self.api_url(&request.path);

        let mut query: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        query.push(("T", token.action_token()));
        query.push(("client", self.client_name.as_str()));

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::AUTHORIZATION, token.authorization_header())
            .query(&query);

        if let Some(sid) = token.sid() {
            builder = builder.header(header::COOKIE, format!("SID={}", sid));
        }

        if request.method == Method::POST {
            let mut form: Vec<(&str, &str)> = request
                .form
                .iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            form.push(("T", token.action_token()));
            builder = builder.form(&form);
        }

        debug!(method = %request.method, path = %request.path, "Sending upstream request");
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        if request.expects_ok && text.trim() != OK_BODY {
            return Err(ApiError::InvalidResponse(format!(
                "Expected OK from {}, got {:?}",
                request.path,
                crate::utils::truncate_string(text.trim(), 200)
            )));
        }

        Ok(UpstreamBody { text })
    }

    /// Check if response is successful, returning a classified error if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let bad_token = response
            .headers()
            .get(BAD_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if response.status().is_success() && !bad_token {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, bad_token, &body))
        }
    }
}

/// Extract `(Auth, SID)` from a ClientLogin body of `KEY=value` lines.
fn parse_client_login(body: &str) -> Option<(String, Option<String>)> {
    let mut auth = None;
    let mut sid = None;
    for line in body.lines() {
        match line.trim().split_once('=') {
            Some(("Auth", value)) if !value.is_empty() => auth = Some(value.to_string()),
            Some(("SID", value)) if !value.is_empty() => sid = Some(value.to_string()),
            _ => {}
        }
    }
    auth.map(|auth| (auth, sid))
}
