//! Item and item-tag persistence

use sqlx::SqlitePool;
use tagsync_common::models::{Item, ItemTag};
use tagsync_common::Result;

/// Load all items (bulk fetch for one-pass in-memory matching)
pub async fn fetch_items(pool: &SqlitePool) -> Result<Vec<Item>> {
    let items = sqlx::query_as::<_, Item>("SELECT id, name, link, image_url, type FROM items")
        .fetch_all(pool)
        .await?;
    Ok(items)
}

/// Insert an item preserving its server-assigned ID (mirror clone path)
pub async fn insert_item_with_id(pool: &SqlitePool, item: &Item) -> Result<()> {
    sqlx::query("INSERT INTO items (id, name, link, image_url, type) VALUES (?, ?, ?, ?, ?)")
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.link)
        .bind(&item.image_url)
        .bind(&item.item_type)
        .execute(pool)
        .await?;
    Ok(())
}

/// Load all item-tag associations
pub async fn fetch_item_tags(pool: &SqlitePool) -> Result<Vec<ItemTag>> {
    let rels = sqlx::query_as::<_, ItemTag>("SELECT item_id, tag_id FROM item_tags")
        .fetch_all(pool)
        .await?;
    Ok(rels)
}

/// Create an item<->tag association, ignoring duplicates
///
/// Returns true if a new edge was created, false if it already existed.
pub async fn insert_item_tag(pool: &SqlitePool, item_id: i64, tag_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO item_tags (item_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(item_id)
    .bind(tag_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert an item-tag association preserving server IDs (mirror clone path)
pub async fn insert_item_tag_with_ids(pool: &SqlitePool, rel: &ItemTag) -> Result<()> {
    sqlx::query("INSERT INTO item_tags (item_id, tag_id) VALUES (?, ?)")
        .bind(rel.item_id)
        .bind(rel.tag_id)
        .execute(pool)
        .await?;
    Ok(())
}
