//! Reconciliation pass: attach taxonomy tags to items
//!
//! Items and source rows share no identity, so rows are matched to items by
//! name: the filename stem of the row's `dir` path against the item's name,
//! both trimmed and compared case-insensitively. The whole catalog is
//! fetched once up front; the pass itself is a single in-memory loop with
//! one idempotent insert per (item, tag) edge.

use std::collections::HashMap;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use tagsync_common::models::{Item, Tag, TagGroup};
use tagsync_common::{Error, Result};

use crate::db::{items, taxonomy};
use crate::db::music_files::DIR_COLUMN;
use crate::services::csv_source::TabularSource;
use crate::services::tagging_client::TaggingClient;
use crate::services::taxonomy_importer::ImportOptions;

const PROGRESS_INTERVAL: usize = 100;

/// Normalized match key for a `dir` path: the trimmed, lowercased filename
/// stem. Returns None when no usable stem remains.
pub fn match_key(dir: &str) -> Option<String> {
    let file_name = dir.trim().rsplit(['/', '\\']).next()?;
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let key = stem.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// One-time in-memory index of the catalog a reconciliation runs against
pub struct TaxonomySnapshot {
    items_by_key: HashMap<String, i64>,
    groups_by_name: HashMap<String, i64>,
    tags_by_group_and_name: HashMap<(i64, String), i64>,
}

impl TaxonomySnapshot {
    pub fn new(items: &[Item], groups: &[TagGroup], tags: &[Tag]) -> Self {
        let items_by_key = items
            .iter()
            .map(|i| (i.name.trim().to_lowercase(), i.id))
            .collect();
        let groups_by_name = groups
            .iter()
            .map(|g| (g.name.trim().to_string(), g.id))
            .collect();
        let tags_by_group_and_name = tags
            .iter()
            .filter_map(|t| {
                t.group_id
                    .map(|group_id| ((group_id, t.name.trim().to_string()), t.id))
            })
            .collect();

        Self {
            items_by_key,
            groups_by_name,
            tags_by_group_and_name,
        }
    }

    /// Load the snapshot from the local store
    pub async fn load_local(pool: &SqlitePool) -> Result<Self> {
        let items = items::fetch_items(pool).await?;
        let groups = taxonomy::fetch_tag_groups(pool).await?;
        let tags = taxonomy::fetch_tags(pool).await?;
        tracing::info!(
            items = items.len(),
            groups = groups.len(),
            tags = tags.len(),
            "Loaded catalog for reconciliation"
        );
        Ok(Self::new(&items, &groups, &tags))
    }

    pub fn find_item(&self, key: &str) -> Option<i64> {
        self.items_by_key.get(key).copied()
    }

    pub fn find_group(&self, name: &str) -> Option<i64> {
        self.groups_by_name.get(name.trim()).copied()
    }

    pub fn find_tag(&self, group_id: i64, value: &str) -> Option<i64> {
        self.tags_by_group_and_name
            .get(&(group_id, value.trim().to_string()))
            .copied()
    }
}

/// Counters for one reconciliation run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Rows with a usable `dir` key that were examined
    pub processed: usize,
    /// Newly created item<->tag edges
    pub tagged: usize,
    /// Rows whose key matched no item
    pub not_found: usize,
    /// Rows without a key, plus values with no matching tag or group
    pub skipped: usize,
    /// Edges whose insert failed (the pass continues)
    pub failed: usize,
}

impl ReconcileStats {
    pub fn display_string(&self) -> String {
        format!(
            "processed: {}, tagged: {}, not_found: {}, skipped: {}, failed: {}",
            self.processed, self.tagged, self.not_found, self.skipped, self.failed
        )
    }
}

/// Tag local items from the source's taxonomy columns
///
/// Idempotent: already-present edges are no-ops, so a re-run converges with
/// `tagged: 0`. Individual edge failures are logged and counted, never fatal.
pub async fn reconcile_local(
    pool: &SqlitePool,
    source: &TabularSource,
    options: &ImportOptions,
    cancel: &CancellationToken,
) -> Result<ReconcileStats> {
    if !source.columns().iter().any(|c| c == DIR_COLUMN) {
        return Err(Error::InvalidInput(format!(
            "source has no {:?} column",
            DIR_COLUMN
        )));
    }

    let snapshot = TaxonomySnapshot::load_local(pool).await?;
    let mut stats = ReconcileStats::default();
    let total = source.row_count();

    let tag_columns: Vec<&String> = source
        .columns()
        .iter()
        .filter(|c| {
            !options
                .excluded_columns
                .iter()
                .any(|ex| ex.eq_ignore_ascii_case(c))
        })
        .collect();

    for row in 0..total {
        if cancel.is_cancelled() {
            tracing::info!(row, total, "Reconciliation cancelled");
            break;
        }

        if row > 0 && row % PROGRESS_INTERVAL == 0 {
            tracing::info!(row, total, summary = %stats.display_string(), "Progress");
        }

        let Some(key) = source.trimmed_value(row, DIR_COLUMN).and_then(match_key) else {
            stats.skipped += 1;
            continue;
        };
        stats.processed += 1;

        let Some(item_id) = snapshot.find_item(&key) else {
            tracing::debug!(key = %key, "No item matches source row");
            stats.not_found += 1;
            continue;
        };

        for column in &tag_columns {
            let Some(value) = source.trimmed_value(row, column) else {
                continue;
            };
            let Some(group_id) = snapshot.find_group(column) else {
                stats.skipped += 1;
                continue;
            };
            let Some(tag_id) = snapshot.find_tag(group_id, value) else {
                tracing::debug!(group = %column, value = %value, "No tag for value");
                stats.skipped += 1;
                continue;
            };

            match items::insert_item_tag(pool, item_id, tag_id).await {
                Ok(true) => stats.tagged += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(item_id, tag_id, error = %e, "Failed to tag item");
                    stats.failed += 1;
                }
            }
        }
    }

    tracing::info!(summary = %stats.display_string(), "Reconciliation complete");
    Ok(stats)
}

/// Push local item<->tag edges to the tagging server
///
/// Assumes local IDs are the server's (a cloned mirror). Duplicate-create
/// conflicts mean the edge already exists and count as skipped.
pub async fn push_item_tags(
    pool: &SqlitePool,
    client: &TaggingClient,
    cancel: &CancellationToken,
) -> Result<ReconcileStats> {
    let edges = items::fetch_item_tags(pool).await?;
    let mut stats = ReconcileStats::default();
    let total = edges.len();

    for (i, edge) in edges.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(pushed = i, total, "Push cancelled");
            break;
        }

        if i > 0 && i % PROGRESS_INTERVAL == 0 {
            tracing::info!(pushed = i, total, "Progress");
        }

        stats.processed += 1;
        match client.create_item_tag(edge.item_id, edge.tag_id).await {
            Ok(()) => stats.tagged += 1,
            Err(e) if e.is_conflict() => stats.skipped += 1,
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    item_id = edge.item_id,
                    tag_id = edge.tag_id,
                    "Server does not know this item or tag"
                );
                stats.not_found += 1;
            }
            Err(e) => {
                tracing::warn!(
                    item_id = edge.item_id,
                    tag_id = edge.tag_id,
                    error = %e,
                    "Failed to push edge"
                );
                stats.failed += 1;
            }
        }
    }

    tracing::info!(summary = %stats.display_string(), "Push complete");
    Ok(stats)
}
