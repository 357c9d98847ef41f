//! Taxonomy import from a tabular source
//!
//! Each non-excluded source column becomes a tag group; each distinct trimmed
//! value in that column becomes a tag in the group. Both targets converge on
//! re-run: locally via check-then-insert, remotely via check-then-create with
//! duplicate-create conflicts counted as "already existing".

use std::collections::{HashMap, HashSet};
use sqlx::SqlitePool;
use tagsync_common::Result;

use crate::db::taxonomy;
use crate::services::csv_source::TabularSource;
use crate::services::tagging_client::TaggingClient;

/// Columns that describe the item itself rather than a taxonomy dimension
const DEFAULT_EXCLUDED_COLUMNS: &[&str] = &["title", "artist", "album", "dir", "link", "image_url"];

/// Taxonomy import options
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Column names that never become tag groups
    pub excluded_columns: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ImportOptions {
    fn is_tag_column(&self, column: &str) -> bool {
        !self
            .excluded_columns
            .iter()
            .any(|ex| ex.eq_ignore_ascii_case(column))
    }
}

/// Counters for one taxonomy import run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub groups_created: usize,
    pub groups_existing: usize,
    pub tags_created: usize,
    pub tags_existing: usize,
}

impl ImportStats {
    pub fn display_string(&self) -> String {
        format!(
            "groups: {} created, {} existing | tags: {} created, {} existing",
            self.groups_created, self.groups_existing, self.tags_created, self.tags_existing
        )
    }
}

/// Import the taxonomy into the local store
pub async fn import_local(
    pool: &SqlitePool,
    source: &TabularSource,
    options: &ImportOptions,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for column in source.columns() {
        if !options.is_tag_column(column) {
            continue;
        }

        let values = source.distinct_values(column);
        if values.is_empty() {
            tracing::debug!(column = %column, "Column has no values, skipping");
            continue;
        }

        let (group_id, group_created) = taxonomy::find_or_create_tag_group(pool, column).await?;
        if group_created {
            stats.groups_created += 1;
        } else {
            stats.groups_existing += 1;
        }

        let mut group_tags = 0usize;
        for value in &values {
            let (tag_id, tag_created) = taxonomy::find_or_create_tag(pool, group_id, value).await?;
            if tag_created {
                stats.tags_created += 1;
                group_tags += 1;
            } else {
                stats.tags_existing += 1;
            }
            taxonomy::insert_tag_group_tag(pool, group_id, tag_id).await?;
        }

        if group_created {
            tracing::info!(
                group = %column,
                tag_count = group_tags,
                "Created tag group '{}' with {} tags",
                column,
                group_tags
            );
        }
    }

    Ok(stats)
}

/// Import the taxonomy into the tagging server
///
/// Server tags are global entities keyed by name; group membership lives in
/// the tag-group-tag association. Existing groups, tags, and associations
/// are fetched once up front, and anything still reported as a duplicate at
/// create time (a concurrent writer) is counted as existing.
pub async fn import_remote(
    client: &TaggingClient,
    source: &TabularSource,
    options: &ImportOptions,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let existing_groups: HashMap<String, i64> = client
        .get_tag_groups()
        .await?
        .into_iter()
        .map(|g| (g.name, g.id))
        .collect();
    let existing_tags: HashMap<String, i64> = client
        .get_tags()
        .await?
        .into_iter()
        .map(|t| (t.name, t.id))
        .collect();
    let existing_rels: HashSet<(i64, i64)> = client
        .get_tag_group_tags()
        .await?
        .into_iter()
        .map(|r| (r.tag_group_id, r.tag_id))
        .collect();

    // First pass creates missing groups and tags by name
    let mut created_any = false;
    for column in source.columns() {
        if !options.is_tag_column(column) {
            continue;
        }
        let values = source.distinct_values(column);
        if values.is_empty() {
            continue;
        }

        if existing_groups.contains_key(column) {
            stats.groups_existing += 1;
        } else {
            match client.create_tag_group(column).await {
                Ok(()) => {
                    stats.groups_created += 1;
                    created_any = true;
                }
                Err(e) if e.is_conflict() => stats.groups_existing += 1,
                Err(e) => return Err(e),
            }
        }

        for value in &values {
            if existing_tags.contains_key(value.as_str()) {
                stats.tags_existing += 1;
                continue;
            }
            match client.create_tag(value).await {
                Ok(()) => {
                    stats.tags_created += 1;
                    created_any = true;
                }
                Err(e) if e.is_conflict() => stats.tags_existing += 1,
                Err(e) => return Err(e),
            }
        }
    }

    // Re-fetch after creates so new entities have known IDs
    let (groups, tags) = if created_any {
        (
            client
                .get_tag_groups()
                .await?
                .into_iter()
                .map(|g| (g.name, g.id))
                .collect::<HashMap<_, _>>(),
            client
                .get_tags()
                .await?
                .into_iter()
                .map(|t| (t.name, t.id))
                .collect::<HashMap<_, _>>(),
        )
    } else {
        (existing_groups, existing_tags)
    };

    // Second pass links tags into their groups
    for column in source.columns() {
        if !options.is_tag_column(column) {
            continue;
        }
        let Some(&group_id) = groups.get(column) else {
            continue;
        };

        for value in source.distinct_values(column) {
            let Some(&tag_id) = tags.get(&value) else {
                continue;
            };
            if existing_rels.contains(&(group_id, tag_id)) {
                continue;
            }
            match client.create_tag_group_tag(group_id, tag_id).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {}
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(summary = %stats.display_string(), "Taxonomy import complete");
    Ok(stats)
}
