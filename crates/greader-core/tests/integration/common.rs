//! Shared test helpers for Google Reader API integration tests
//!
//! Provides wiremock-based mock server setup for the ClientLogin and token
//! endpoints. The mock server is mounted under `/api` so base URLs with a
//! path prefix (as FreshRSS uses) are exercised.

use std::time::Duration;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use greader_core::{Config, Credentials, Translator};

pub const EMAIL: &str = "alice";
pub const PASSWORD: &str = "secret1";
pub const AUTH: &str = "alice/8e6845e05a3b1c2d";
pub const SID: &str = "alice/8e6845e05a3b1c2d";

/// Path prefix of the API below the mock server root
pub const API: &str = "/api/reader/api/0";

pub fn config_for(server: &MockServer) -> Config {
    Config::new(
        Credentials::new(EMAIL, PASSWORD),
        &format!("{}/api", server.uri()),
    )
    .expect("mock server URI should be a valid base URL")
    .with_timeout(Duration::from_secs(5))
}

pub fn translator_for(server: &MockServer) -> Translator {
    Translator::from_config(&config_for(server)).expect("translator should build")
}

/// Starts a mock server and returns it with a translator pointing at it.
/// No endpoints are mounted.
pub async fn setup_reader_mock() -> (MockServer, Translator) {
    let server = MockServer::start().await;
    let translator = translator_for(&server);
    (server, translator)
}

fn login_body() -> String {
    format!("SID={}\nLSID=null\nAuth={}\n", SID, AUTH)
}

/// Mounts ClientLogin accepting alice/secret1, expected `logins` times.
pub async fn mount_client_login(server: &MockServer, logins: u64) {
    Mock::given(method("POST"))
        .and(path("/api/accounts/ClientLogin"))
        .and(body_string_contains("Email=alice"))
        .and(body_string_contains("Passwd=secret1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_body()))
        .expect(logins)
        .named("ClientLogin")
        .mount(server)
        .await;
}

/// Mounts ClientLogin rejecting every attempt the way FreshRSS does.
pub async fn mount_client_login_rejected(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Error=BadAuthentication\n"))
        .expect(1)
        .named("ClientLogin (rejected)")
        .mount(server)
        .await;
}

/// Mounts the action token endpoint. The n-th login receives
/// `tokens[n]`; the last entry is repeated for any further logins.
pub async fn mount_action_tokens(server: &MockServer, tokens: &[&str]) {
    let (last, first) = tokens.split_last().expect("at least one token");
    for token in first {
        Mock::given(method("GET"))
            .and(path(format!("{}/token", API)))
            .and(header("Authorization", format!("GoogleLogin auth={}", AUTH).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", token)))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("{}/token", API)))
        .and(header("Authorization", format!("GoogleLogin auth={}", AUTH).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}\n", last)))
        .mount(server)
        .await;
}

/// Mounts a working login that hands out `tokens` in order.
pub async fn mount_login(server: &MockServer, tokens: &[&str], logins: u64) {
    mount_client_login(server, logins).await;
    mount_action_tokens(server, tokens).await;
}

/// The upstream answer for a rejected action token
pub fn bad_token_response() -> ResponseTemplate {
    ResponseTemplate::new(401)
        .insert_header("X-Reader-Google-Bad-Token", "true")
        .set_body_string("Unauthorized!")
}

pub fn stream_contents_json(stream_id: &str, items: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": stream_id,
        "updated": 1_700_000_100,
        "items": items,
    })
}

pub fn item_json(id: &str, title: &str, feed: &str, read: bool) -> serde_json::Value {
    let mut categories = vec!["user/-/state/com.google/reading-list"];
    if read {
        categories.push("user/-/state/com.google/read");
    }
    serde_json::json!({
        "id": id,
        "title": title,
        "published": 1_700_000_000,
        "categories": categories,
        "origin": {"streamId": feed, "title": "Example feed"},
        "summary": {"content": format!("<p>{}</p>", title)},
    })
}
