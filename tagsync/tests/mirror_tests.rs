//! Mirror clone and verify tests against a mock server

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tagsync::db::{self, count_rows};
use tagsync::services::mirror;
use tagsync::services::retry::RetryPolicy;
use tagsync::services::tagging_client::TaggingClient;

async fn mirror_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    db::init_tables(&pool).await.expect("schema");
    pool
}

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A small but complete server catalog: one topic, two groups, three tags,
/// two items, with every association kind populated.
async fn mount_catalog(server: &MockServer) {
    mount_get(
        server,
        "/api/tag-groups",
        json!([
            {"id": 1, "name": "mood", "description": null},
            {"id": 2, "name": "genre", "description": null}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/tags",
        json!([
            {"id": 10, "name": "happy", "group_id": null, "description": null},
            {"id": 11, "name": "sad", "group_id": null, "description": null},
            {"id": 12, "name": "rock", "group_id": null, "description": null}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/tag-group-tags",
        json!([
            {"tag_group_id": 1, "tag_id": 10},
            {"tag_group_id": 1, "tag_id": 11},
            {"tag_group_id": 2, "tag_id": 12}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/topics",
        json!([{"id": 1, "name": "library", "description": "everything"}]),
    )
    .await;
    mount_get(
        server,
        "/api/topic-tag-groups",
        json!([{"topic_id": 1, "tag_group_id": 1}]),
    )
    .await;
    mount_get(
        server,
        "/api/items",
        json!([
            {"id": 100, "name": "Track One", "link": null, "image_url": null, "type": "file"},
            {"id": 101, "name": "Track Two", "link": null, "image_url": null, "type": "file"}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/item-tags",
        json!([
            {"item_id": 100, "tag_id": 10},
            {"item_id": 101, "tag_id": 12}
        ]),
    )
    .await;
    mount_get(
        server,
        "/api/topic-items",
        json!([{"topic_id": 1, "item_id": 100}]),
    )
    .await;
}

fn client(server: &MockServer) -> TaggingClient {
    TaggingClient::with_retry_policy(&server.uri(), RetryPolicy::none()).unwrap()
}

#[tokio::test]
async fn clone_all_mirrors_every_table() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let pool = mirror_pool().await;

    mirror::clone_all(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(count_rows(&pool, "tag_groups").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "tags").await.unwrap(), 3);
    assert_eq!(count_rows(&pool, "tag_group_tags").await.unwrap(), 3);
    assert_eq!(count_rows(&pool, "topics").await.unwrap(), 1);
    assert_eq!(count_rows(&pool, "topic_tag_groups").await.unwrap(), 1);
    assert_eq!(count_rows(&pool, "items").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "item_tags").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "topic_items").await.unwrap(), 1);

    // Server IDs are preserved
    let id: i64 = sqlx::query_scalar("SELECT id FROM items WHERE name = 'Track One'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(id, 100);

    // Tag group membership is derived from the associations
    let group_id: Option<i64> = sqlx::query_scalar("SELECT group_id FROM tags WHERE id = 12")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(group_id, Some(2));
}

#[tokio::test]
async fn clone_all_replaces_stale_rows() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let pool = mirror_pool().await;

    sqlx::query("INSERT INTO tag_groups (id, name) VALUES (99, 'stale')")
        .execute(&pool)
        .await
        .unwrap();

    mirror::clone_all(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    let stale: Option<i64> = sqlx::query_scalar("SELECT id FROM tag_groups WHERE name = 'stale'")
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert_eq!(stale, None);
    assert_eq!(count_rows(&pool, "tag_groups").await.unwrap(), 2);
}

#[tokio::test]
async fn clone_items_leaves_taxonomy_alone() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let pool = mirror_pool().await;

    mirror::clone_all(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();
    mirror::clone_items(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(count_rows(&pool, "items").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "item_tags").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "tag_groups").await.unwrap(), 2);
    assert_eq!(count_rows(&pool, "tags").await.unwrap(), 3);
}

#[tokio::test]
async fn verify_passes_on_faithful_mirror() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let pool = mirror_pool().await;
    mirror::clone_all(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    let report = mirror::verify_sample(&pool, &client(&server), 10)
        .await
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.items_checked, 2);
}

#[tokio::test]
async fn verify_reports_count_mismatch() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let pool = mirror_pool().await;
    // Empty mirror against a populated server
    let report = mirror::verify_sample(&pool, &client(&server), 10)
        .await
        .unwrap();

    assert!(!report.is_clean());
    assert!(!report.count_mismatches.is_empty());
    // Every sampled server item is absent from the empty mirror
    assert_eq!(report.items_checked, 2);
    assert_eq!(report.items_missing, 2);
}
