//! Tag group, tag, and topic persistence
//!
//! Creation is check-then-insert under unique constraints: re-running an
//! import converges instead of erroring, and duplicates are detected
//! structurally rather than by inspecting error messages.

use sqlx::SqlitePool;
use tagsync_common::models::{Tag, TagGroup, TagGroupTag, Topic, TopicItem, TopicTagGroup};
use tagsync_common::Result;

/// Load all tag groups
pub async fn fetch_tag_groups(pool: &SqlitePool) -> Result<Vec<TagGroup>> {
    let groups =
        sqlx::query_as::<_, TagGroup>("SELECT id, name, description FROM tag_groups")
            .fetch_all(pool)
            .await?;
    Ok(groups)
}

/// Load all tags
pub async fn fetch_tags(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>("SELECT id, name, group_id, description FROM tags")
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

/// Load the tags belonging to one group
pub async fn fetch_tags_in_group(pool: &SqlitePool, group_id: i64) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT id, name, group_id, description FROM tags WHERE group_id = ?",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// Load all group<->tag associations
pub async fn fetch_tag_group_tags(pool: &SqlitePool) -> Result<Vec<TagGroupTag>> {
    let rels = sqlx::query_as::<_, TagGroupTag>(
        "SELECT tag_group_id, tag_id FROM tag_group_tags",
    )
    .fetch_all(pool)
    .await?;
    Ok(rels)
}

/// Load all topics
pub async fn fetch_topics(pool: &SqlitePool) -> Result<Vec<Topic>> {
    let topics = sqlx::query_as::<_, Topic>("SELECT id, name, description FROM topics")
        .fetch_all(pool)
        .await?;
    Ok(topics)
}

/// Load all topic<->tag-group associations
pub async fn fetch_topic_tag_groups(pool: &SqlitePool) -> Result<Vec<TopicTagGroup>> {
    let rels = sqlx::query_as::<_, TopicTagGroup>(
        "SELECT topic_id, tag_group_id FROM topic_tag_groups",
    )
    .fetch_all(pool)
    .await?;
    Ok(rels)
}

/// Load all topic<->item associations
pub async fn fetch_topic_items(pool: &SqlitePool) -> Result<Vec<TopicItem>> {
    let rels = sqlx::query_as::<_, TopicItem>("SELECT topic_id, item_id FROM topic_items")
        .fetch_all(pool)
        .await?;
    Ok(rels)
}

/// Find a tag group by name, creating it if absent
///
/// Returns the group ID and whether a new row was created.
pub async fn find_or_create_tag_group(pool: &SqlitePool, name: &str) -> Result<(i64, bool)> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM tag_groups WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    let result = sqlx::query("INSERT INTO tag_groups (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok((result.last_insert_rowid(), true))
}

/// Find a tag by (group, name), creating it if absent
pub async fn find_or_create_tag(
    pool: &SqlitePool,
    group_id: i64,
    name: &str,
) -> Result<(i64, bool)> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM tags WHERE group_id = ? AND name = ?")
            .bind(group_id)
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    let result = sqlx::query("INSERT INTO tags (name, group_id) VALUES (?, ?)")
        .bind(name)
        .bind(group_id)
        .execute(pool)
        .await?;
    Ok((result.last_insert_rowid(), true))
}

/// Create a group<->tag association, ignoring duplicates
pub async fn insert_tag_group_tag(pool: &SqlitePool, group_id: i64, tag_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO tag_group_tags (tag_group_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(group_id)
    .bind(tag_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert a tag group preserving its server-assigned ID (mirror clone path)
pub async fn insert_tag_group_with_id(pool: &SqlitePool, group: &TagGroup) -> Result<()> {
    sqlx::query("INSERT INTO tag_groups (id, name, description) VALUES (?, ?, ?)")
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a tag preserving its server-assigned ID (mirror clone path)
pub async fn insert_tag_with_id(pool: &SqlitePool, tag: &Tag) -> Result<()> {
    sqlx::query("INSERT INTO tags (id, name, group_id, description) VALUES (?, ?, ?, ?)")
        .bind(tag.id)
        .bind(&tag.name)
        .bind(tag.group_id)
        .bind(&tag.description)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a group-tag association with server IDs (mirror clone path)
pub async fn insert_tag_group_tag_with_ids(pool: &SqlitePool, rel: &TagGroupTag) -> Result<()> {
    sqlx::query("INSERT INTO tag_group_tags (tag_group_id, tag_id) VALUES (?, ?)")
        .bind(rel.tag_group_id)
        .bind(rel.tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a topic preserving its server-assigned ID (mirror clone path)
pub async fn insert_topic_with_id(pool: &SqlitePool, topic: &Topic) -> Result<()> {
    sqlx::query("INSERT INTO topics (id, name, description) VALUES (?, ?, ?)")
        .bind(topic.id)
        .bind(&topic.name)
        .bind(&topic.description)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a topic-tag-group association with server IDs (mirror clone path)
pub async fn insert_topic_tag_group_with_ids(
    pool: &SqlitePool,
    rel: &TopicTagGroup,
) -> Result<()> {
    sqlx::query("INSERT INTO topic_tag_groups (topic_id, tag_group_id) VALUES (?, ?)")
        .bind(rel.topic_id)
        .bind(rel.tag_group_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a topic-item association with server IDs (mirror clone path)
pub async fn insert_topic_item_with_ids(pool: &SqlitePool, rel: &TopicItem) -> Result<()> {
    sqlx::query("INSERT INTO topic_items (topic_id, item_id) VALUES (?, ?)")
        .bind(rel.topic_id)
        .bind(rel.item_id)
        .execute(pool)
        .await?;
    Ok(())
}
