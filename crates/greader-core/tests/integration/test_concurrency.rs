//! Concurrent callers share one session: one login on a cold start and one
//! reauthentication when the token expires under all of them at once.

use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use greader_core::Operation;

use crate::common::{self, API};

const CALLERS: usize = 8;

fn subscriptions_json() -> serde_json::Value {
    json!({"subscriptions": [{"id": "feed/1", "title": "One", "categories": []}]})
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_start_logs_in_once() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1"], 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .and(query_param("T", "token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(subscriptions_json()))
        .expect(CALLERS as u64)
        .mount(&server)
        .await;

    let results = join_all((0..CALLERS).map(|_| {
        let translator = translator.clone();
        tokio::spawn(async move { translator.execute(Operation::ListSubscriptions).await })
    }))
    .await;

    for result in results {
        let result = result.expect("task should not panic");
        assert!(result.success, "unexpected error: {:?}", result.error);
    }
    assert_eq!(translator.session().login_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_expiry_reauthenticates_once() {
    let (server, translator) = common::setup_reader_mock().await;
    common::mount_login(&server, &["token-1", "token-2"], 2).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .and(query_param("T", "token-1"))
        .respond_with(common::bad_token_response())
        .expect(CALLERS as u64)
        .named("subscription list with expired token")
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/subscription/list", API)))
        .and(query_param("T", "token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(subscriptions_json()))
        .expect(CALLERS as u64)
        .named("subscription list with fresh token")
        .mount(&server)
        .await;

    let warm = translator.session().ensure_token().await.expect("initial login");
    assert_eq!(warm.action_token(), "token-1");

    let results = join_all((0..CALLERS).map(|_| {
        let translator = translator.clone();
        tokio::spawn(async move { translator.execute(Operation::ListSubscriptions).await })
    }))
    .await;

    for result in results {
        let result = result.expect("task should not panic");
        assert!(result.success, "unexpected error: {:?}", result.error);
    }
    assert_eq!(translator.session().login_count(), 2);

    let current = translator.session().ensure_token().await.expect("cached token");
    assert_eq!(current.action_token(), "token-2");
}
