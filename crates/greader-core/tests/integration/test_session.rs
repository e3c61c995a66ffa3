//! Session lifecycle: login on first use, reuse, expiry retry, and the
//! errors that must reach the caller.

use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use greader_core::models::ItemStateChange;
use greader_core::operations::{ListUnreadItems, MarkItemState};
use greader_core::{ErrorKind, Operation, Payload, Translator};

use crate::common::{self, API, AUTH};

fn subscriptions_json() -> serde_json::Value {
    serde_json::json!({"subscriptions": [
        {"id": "feed/1", "title": "One", "categories": [], "url": "https://one.example/rss"}
    ]})
}

#[tokio::test]
async fn test_login_once_then_reuse_token() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1"], 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .and(query_param("T", "token-1"))
        .and(header("Authorization", format!("GoogleLogin auth={}", AUTH).as_str()))
        .and(header("Cookie", format!("SID={}", common::SID).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(subscriptions_json()))
        .expect(3)
        .mount(&server)
        .await;

    assert!(!translator.session().is_authenticated().await);

    for _ in 0..3 {
        let subs = translator
            .list_subscriptions()
            .await
            .expect("list_subscriptions failed");
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, "feed/1");
    }

    assert!(translator.session().is_authenticated().await);
    assert_eq!(translator.session().login_count(), 1);
}

#[tokio::test]
async fn test_invalid_credentials_never_reach_operation_endpoint() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_client_login_rejected(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/token", API)))
        .respond_with(ResponseTemplate::new(200).set_body_string("unused"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .respond_with(ResponseTemplate::new(200).set_body_json(subscriptions_json()))
        .expect(0)
        .mount(&server)
        .await;

    let result = translator.execute(Operation::ListSubscriptions).await;

    assert!(!result.success);
    assert!(result.payload.is_none());
    let error = result.error.expect("error descriptor");
    assert_eq!(error.kind, ErrorKind::Authentication);
    assert!(error.message.contains("BadAuthentication"));
    assert!(!error.transient);
    assert!(!translator.session().is_authenticated().await);
}

#[tokio::test]
async fn test_login_without_auth_line_is_authentication_error() {
    let (server, translator) = common::setup_reader_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/accounts/ClientLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login page</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = translator
        .session()
        .ensure_token()
        .await
        .expect_err("login should fail");
    assert!(matches!(err, greader_core::ApiError::Authentication(_)));
}

#[tokio::test]
async fn test_expired_token_on_mark_is_retried_after_relogin() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1", "token-2"], 2).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/edit-tag", API)))
        .and(query_param("T", "token-1"))
        .respond_with(common::bad_token_response())
        .expect(1)
        .named("edit-tag with expired token")
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/edit-tag", API)))
        .and(query_param("T", "token-2"))
        .and(wiremock::matchers::body_string_contains("i=123"))
        .and(wiremock::matchers::body_string_contains("T=token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .named("edit-tag with fresh token")
        .mount(&server)
        .await;

    // Prime the cache with token-1
    translator.session().ensure_token().await.expect("initial login");

    let result = translator
        .execute(Operation::MarkItemState(MarkItemState {
            item: "123".to_string(),
            read: true,
            ..Default::default()
        }))
        .await;

    assert!(result.success, "unexpected error: {:?}", result.error);
    assert!(result.error.is_none());
    assert_eq!(
        result.payload,
        Some(Payload::ItemState(ItemStateChange::new(
            vec!["123".to_string()],
            true
        )))
    );
    assert_eq!(translator.session().login_count(), 2);
}

#[tokio::test]
async fn test_second_expiry_is_surfaced_without_looping() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1", "token-2"], 2).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized!"))
        .expect(2)
        .mount(&server)
        .await;

    let result = translator.execute(Operation::ListSubscriptions).await;

    assert!(!result.success);
    assert_eq!(result.error_kind(), Some(ErrorKind::Authentication));
    assert_eq!(translator.session().login_count(), 2);
}

#[tokio::test]
async fn test_upstream_error_is_not_retried() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1"], 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/stream/contents/feed/404", API)))
        .respond_with(ResponseTemplate::new(404).set_body_string("Feed not found"))
        .expect(1)
        .mount(&server)
        .await;

    let result = translator
        .execute(Operation::ListUnreadItems(ListUnreadItems {
            feed: Some("404".to_string()),
            ..Default::default()
        }))
        .await;

    let error = result.error.expect("error descriptor");
    assert_eq!(error.kind, ErrorKind::Upstream);
    assert_eq!(error.status, Some(404));
    assert_eq!(error.message, "Feed not found");
}

#[tokio::test]
async fn test_timeout_is_transient_network_error() {
    let server = wiremock::MockServer::start().await;
    let config = common::config_for(&server).with_timeout(Duration::from_millis(200));
    let translator = Translator::from_config(&config).expect("translator should build");
    common::mount_login(&server, &["token-1"], 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(subscriptions_json())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let result = translator.execute(Operation::ListSubscriptions).await;

    let error = result.error.expect("error descriptor");
    assert_eq!(error.kind, ErrorKind::Network);
    assert!(error.transient);
    // A timeout says nothing about the session
    assert!(translator.session().is_authenticated().await);
}

#[tokio::test]
async fn test_invalidate_forces_fresh_login() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1", "token-2"], 2).await;

    let first = translator.session().ensure_token().await.expect("login");
    let again = translator.session().ensure_token().await.expect("cached");
    assert_eq!(first.action_token(), again.action_token());

    translator.session().invalidate().await;
    assert!(!translator.session().is_authenticated().await);

    let second = translator.session().ensure_token().await.expect("relogin");
    assert_eq!(second.action_token(), "token-2");
    assert_eq!(translator.session().login_count(), 2);
}
