//! Remote taxonomy import and tag push tests against a mock server

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tagsync::db::{self, items, taxonomy};
use tagsync::services::csv_source::TabularSource;
use tagsync::services::reconciler;
use tagsync::services::retry::RetryPolicy;
use tagsync::services::tagging_client::TaggingClient;
use tagsync::services::taxonomy_importer::{self, ImportOptions};
use tagsync_common::models::Item;

fn client(server: &MockServer) -> TaggingClient {
    TaggingClient::with_retry_policy(&server.uri(), RetryPolicy::none()).unwrap()
}

async fn taxonomy_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    db::init_tables(&pool).await.expect("schema");
    pool
}

#[tokio::test]
async fn import_remote_creates_missing_and_counts_conflicts_as_existing() {
    let server = MockServer::start().await;

    // Empty catalog on the first fetch, populated after the create phase
    Mock::given(method("GET"))
        .and(path("/api/tag-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tag-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "mood", "description": null}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "happy", "group_id": null, "description": null},
            {"id": 11, "name": "sad", "group_id": null, "description": null}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tag-group-tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/tag-groups"))
        .and(body_json(json!({"name": "mood"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .and(body_json(json!({"name": "happy"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    // A concurrent writer beat us to this one
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .and(body_json(json!({"name": "sad"})))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(1)
        .mount(&server)
        .await;

    // Both tags get linked into the group after the re-fetch resolves IDs
    Mock::given(method("POST"))
        .and(path("/api/tag-group-tags"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let csv = "\
title,mood,dir
Track One,happy,/music/Track One.mp3
Track Two,sad,/music/Track Two.mp3
";
    let source = TabularSource::from_csv_reader(csv.as_bytes()).unwrap();

    let stats = taxonomy_importer::import_remote(&client(&server), &source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.groups_created, 1);
    assert_eq!(stats.groups_existing, 0);
    assert_eq!(stats.tags_created, 1);
    assert_eq!(stats.tags_existing, 1);
}

#[tokio::test]
async fn import_remote_with_full_catalog_creates_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tag-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "mood", "description": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "name": "happy", "group_id": null, "description": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tag-group-tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"tag_group_id": 1, "tag_id": 10}
        ])))
        .mount(&server)
        .await;
    // No create or association call is expected at all
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let csv = "title,mood,dir\nTrack One,happy,/music/Track One.mp3\n";
    let source = TabularSource::from_csv_reader(csv.as_bytes()).unwrap();

    let stats = taxonomy_importer::import_remote(&client(&server), &source, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(stats.groups_created, 0);
    assert_eq!(stats.groups_existing, 1);
    assert_eq!(stats.tags_created, 0);
    assert_eq!(stats.tags_existing, 1);
}

#[tokio::test]
async fn push_item_tags_splits_counters_by_response() {
    let server = MockServer::start().await;
    let pool = taxonomy_pool().await;

    let (group_id, _) = taxonomy::find_or_create_tag_group(&pool, "mood").await.unwrap();
    let (tag_id, _) = taxonomy::find_or_create_tag(&pool, group_id, "happy").await.unwrap();
    for (id, name) in [(1, "Track One"), (2, "Track Two"), (3, "Track Three"), (4, "Track Four")] {
        items::insert_item_with_id(
            &pool,
            &Item {
                id,
                name: name.to_string(),
                link: None,
                image_url: None,
                item_type: "file".to_string(),
            },
        )
        .await
        .unwrap();
        items::insert_item_tag(&pool, id, tag_id).await.unwrap();
    }

    let edge = |item_id: i64| json!({"itemId": item_id, "tagId": tag_id});
    Mock::given(method("POST"))
        .and(path("/api/item-tags"))
        .and(body_json(edge(1)))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/item-tags"))
        .and(body_json(edge(2)))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/item-tags"))
        .and(body_json(edge(3)))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such item"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/item-tags"))
        .and(body_json(edge(4)))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad edge"))
        .mount(&server)
        .await;

    let stats = reconciler::push_item_tags(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.processed, 4);
    assert_eq!(stats.tagged, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn push_item_tags_with_empty_mirror_is_a_no_op() {
    let server = MockServer::start().await;
    let pool = taxonomy_pool().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let stats = reconciler::push_item_tags(&pool, &client(&server), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(stats.tagged, 0);
}
