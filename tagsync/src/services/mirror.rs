//! Mirror the tagging server into the local store
//!
//! A clone replaces the local mirror wholesale: fetch every collection,
//! clear the mirror tables in dependency order, then insert with the
//! server's IDs preserved so later pushes can reference the same entities.

use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use tagsync_common::models::{Item, ItemTag, Tag, TagGroup, TagGroupTag, Topic, TopicItem, TopicTagGroup};
use tagsync_common::Result;

use crate::db::{self, items, taxonomy};
use crate::services::tagging_client::TaggingClient;

/// Every server collection, fetched at one point in time
pub struct ServerSnapshot {
    pub tag_groups: Vec<TagGroup>,
    pub tags: Vec<Tag>,
    pub tag_group_tags: Vec<TagGroupTag>,
    pub topics: Vec<Topic>,
    pub topic_tag_groups: Vec<TopicTagGroup>,
    pub items: Vec<Item>,
    pub item_tags: Vec<ItemTag>,
    pub topic_items: Vec<TopicItem>,
}

/// Fetch all eight collections from the server
pub async fn fetch_server_snapshot(client: &TaggingClient) -> Result<ServerSnapshot> {
    let snapshot = ServerSnapshot {
        tag_groups: client.get_tag_groups().await?,
        tags: client.get_tags().await?,
        tag_group_tags: client.get_tag_group_tags().await?,
        topics: client.get_topics().await?,
        topic_tag_groups: client.get_topic_tag_groups().await?,
        items: client.get_items().await?,
        item_tags: client.get_item_tags().await?,
        topic_items: client.get_topic_items().await?,
    };

    tracing::info!(
        tag_groups = snapshot.tag_groups.len(),
        tags = snapshot.tags.len(),
        topics = snapshot.topics.len(),
        items = snapshot.items.len(),
        item_tags = snapshot.item_tags.len(),
        "Fetched server snapshot"
    );
    Ok(snapshot)
}

fn log_progress(table: &str, done: usize, total: usize, interval: usize) {
    if done > 0 && done % interval == 0 {
        tracing::info!(table, done, total, "Progress");
    }
}

/// Replace the local mirror with the server's current state
///
/// Tags on the server have no group of their own; the local `tags.group_id`
/// is filled from the first group association so name-based lookups work.
/// Cancellation between tables leaves a partial mirror; re-run to repair.
pub async fn clone_all(
    pool: &SqlitePool,
    client: &TaggingClient,
    cancel: &CancellationToken,
) -> Result<()> {
    let snapshot = fetch_server_snapshot(client).await?;

    db::clear_mirror_tables(pool).await?;

    let total = snapshot.tag_groups.len();
    for (i, group) in snapshot.tag_groups.iter().enumerate() {
        taxonomy::insert_tag_group_with_id(pool, group).await?;
        log_progress("tag_groups", i, total, 10);
    }
    tracing::info!(count = total, "Cloned tag groups");

    if cancel.is_cancelled() {
        tracing::info!("Clone cancelled");
        return Ok(());
    }

    // Derive each tag's group from its first association when the server
    // did not provide one
    let tags: Vec<Tag> = snapshot
        .tags
        .iter()
        .map(|tag| {
            let group_id = tag.group_id.or_else(|| {
                snapshot
                    .tag_group_tags
                    .iter()
                    .find(|rel| rel.tag_id == tag.id)
                    .map(|rel| rel.tag_group_id)
            });
            Tag {
                group_id,
                ..tag.clone()
            }
        })
        .collect();

    let total = tags.len();
    for (i, tag) in tags.iter().enumerate() {
        taxonomy::insert_tag_with_id(pool, tag).await?;
        log_progress("tags", i, total, 100);
    }
    tracing::info!(count = total, "Cloned tags");

    for rel in &snapshot.tag_group_tags {
        taxonomy::insert_tag_group_tag_with_ids(pool, rel).await?;
    }
    tracing::info!(count = snapshot.tag_group_tags.len(), "Cloned tag group associations");

    if cancel.is_cancelled() {
        tracing::info!("Clone cancelled");
        return Ok(());
    }

    let total = snapshot.topics.len();
    for (i, topic) in snapshot.topics.iter().enumerate() {
        taxonomy::insert_topic_with_id(pool, topic).await?;
        log_progress("topics", i, total, 10);
    }
    for rel in &snapshot.topic_tag_groups {
        taxonomy::insert_topic_tag_group_with_ids(pool, rel).await?;
    }
    tracing::info!(count = total, "Cloned topics");

    if cancel.is_cancelled() {
        tracing::info!("Clone cancelled");
        return Ok(());
    }

    let total = snapshot.items.len();
    for (i, item) in snapshot.items.iter().enumerate() {
        items::insert_item_with_id(pool, item).await?;
        log_progress("items", i, total, 100);
    }
    tracing::info!(count = total, "Cloned items");

    let total = snapshot.item_tags.len();
    for (i, rel) in snapshot.item_tags.iter().enumerate() {
        items::insert_item_tag_with_ids(pool, rel).await?;
        log_progress("item_tags", i, total, 100);
    }
    for rel in &snapshot.topic_items {
        taxonomy::insert_topic_item_with_ids(pool, rel).await?;
    }
    tracing::info!(
        item_tags = snapshot.item_tags.len(),
        topic_items = snapshot.topic_items.len(),
        "Cloned item associations"
    );

    Ok(())
}

/// Replace only the local items (and their dependent associations)
///
/// Item-tag and topic-item rows reference items, so they are cleared along
/// with the items table and re-fetched from the server.
pub async fn clone_items(
    pool: &SqlitePool,
    client: &TaggingClient,
    cancel: &CancellationToken,
) -> Result<()> {
    let server_items = client.get_items().await?;
    let item_tags = client.get_item_tags().await?;
    let topic_items = client.get_topic_items().await?;

    for table in ["topic_items", "item_tags", "items"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(pool)
            .await?;
    }

    let total = server_items.len();
    for (i, item) in server_items.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(done = i, total, "Clone cancelled");
            return Ok(());
        }
        items::insert_item_with_id(pool, item).await?;
        log_progress("items", i, total, 100);
    }

    for rel in &item_tags {
        items::insert_item_tag_with_ids(pool, rel).await?;
    }
    for rel in &topic_items {
        taxonomy::insert_topic_item_with_ids(pool, rel).await?;
    }

    tracing::info!(
        items = total,
        item_tags = item_tags.len(),
        topic_items = topic_items.len(),
        "Cloned items"
    );
    Ok(())
}

/// Result of a mirror verification
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Tables whose local and server row counts differ: (table, local, server)
    pub count_mismatches: Vec<(String, i64, usize)>,
    pub items_checked: usize,
    pub items_mismatched: usize,
    pub items_missing: usize,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.count_mismatches.is_empty() && self.items_mismatched == 0 && self.items_missing == 0
    }

    pub fn display_string(&self) -> String {
        format!(
            "count mismatches: {}, items checked: {}, mismatched: {}, missing locally: {}",
            self.count_mismatches.len(),
            self.items_checked,
            self.items_mismatched,
            self.items_missing
        )
    }
}

/// Compare the local mirror against the server
///
/// Row counts are compared for every mirror table, then a random sample of
/// server items is checked for presence (by ID) and name in the local mirror.
pub async fn verify_sample(
    pool: &SqlitePool,
    client: &TaggingClient,
    sample_size: usize,
) -> Result<VerifyReport> {
    let snapshot = fetch_server_snapshot(client).await?;
    let mut report = VerifyReport::default();

    let server_counts: [(&str, usize); 8] = [
        ("tag_groups", snapshot.tag_groups.len()),
        ("tags", snapshot.tags.len()),
        ("tag_group_tags", snapshot.tag_group_tags.len()),
        ("topics", snapshot.topics.len()),
        ("topic_tag_groups", snapshot.topic_tag_groups.len()),
        ("items", snapshot.items.len()),
        ("item_tags", snapshot.item_tags.len()),
        ("topic_items", snapshot.topic_items.len()),
    ];
    for (table, server_count) in server_counts {
        let local_count = db::count_rows(pool, table).await?;
        if local_count != server_count as i64 {
            tracing::warn!(table, local_count, server_count, "Row count mismatch");
            report
                .count_mismatches
                .push((table.to_string(), local_count, server_count));
        }
    }

    let local_by_id: std::collections::HashMap<i64, String> = items::fetch_items(pool)
        .await?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect();

    let sample: Vec<&Item> = snapshot
        .items
        .choose_multiple(
            &mut rand::thread_rng(),
            sample_size.min(snapshot.items.len()),
        )
        .collect();

    for remote in sample {
        report.items_checked += 1;
        match local_by_id.get(&remote.id) {
            Some(local_name) if *local_name == remote.name => {
                tracing::debug!(item_id = remote.id, "FOUND");
            }
            Some(local_name) => {
                tracing::warn!(
                    item_id = remote.id,
                    local_name = %local_name,
                    remote_name = %remote.name,
                    "Item name mismatch"
                );
                report.items_mismatched += 1;
            }
            None => {
                tracing::warn!(item_id = remote.id, name = %remote.name, "MISSING locally");
                report.items_missing += 1;
            }
        }
    }

    tracing::info!(summary = %report.display_string(), "Verification complete");
    Ok(report)
}
