//! Tagging client tests against a mock server

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tagsync::services::retry::RetryPolicy;
use tagsync::services::tagging_client::TaggingClient;
use tagsync_common::Error;

fn fast_client(server: &MockServer) -> TaggingClient {
    TaggingClient::with_retry_policy(
        &server.uri(),
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn get_items_parses_snake_case_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Track One", "link": "http://x/1", "image_url": "http://x/1.png", "type": "file"},
            {"id": 2, "name": "Track Two", "link": null, "image_url": null}
        ])))
        .mount(&server)
        .await;

    let items = fast_client(&server).get_items().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].image_url.as_deref(), Some("http://x/1.png"));
    // Missing type falls back to the default
    assert_eq!(items[1].item_type, "file");
}

#[tokio::test]
async fn missing_item_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such item"))
        .mount(&server)
        .await;

    let err = fast_client(&server).get_item(99).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_association_maps_to_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/item-tags"))
        .and(body_json(json!({"itemId": 3, "tagId": 9})))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .mount(&server)
        .await;

    let err = fast_client(&server).create_item_tag(3, 9).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn server_errors_are_retried_on_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "name": "happy", "group_id": 1, "description": null}
        ])))
        .mount(&server)
        .await;

    let tags = fast_client(&server).get_tags().await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "happy");
}

#[tokio::test]
async fn entity_creates_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_client(&server).create_tag("happy").await.unwrap_err();
    assert!(matches!(err, Error::Api(503, _)));
}

#[tokio::test]
async fn client_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/tags/5"))
        .respond_with(ResponseTemplate::new(400).set_body_string("tag in use"))
        .mount(&server)
        .await;

    let err = fast_client(&server).delete_tag(5).await.unwrap_err();
    match err {
        Error::Api(400, body) => assert_eq!(body, "tag in use"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn connection_refused_maps_to_connection_error() {
    // Port from a server that has been shut down
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = TaggingClient::with_retry_policy(&uri, RetryPolicy::none()).unwrap();
    let err = client.get_items().await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}
