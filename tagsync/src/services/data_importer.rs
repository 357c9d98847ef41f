//! Music data import from a tabular source
//!
//! Creates the music_files table from the source's header and loads every
//! row. The `dir` unique constraint makes re-imports converge: duplicate
//! rows are counted and skipped, not errors.

use sqlx::SqlitePool;
use tagsync_common::Result;

use crate::db::music_files::{
    create_music_files_table, insert_music_file, ColumnValue, INTEGER_COLUMNS,
};
use crate::services::csv_source::TabularSource;

/// Counters for one data import run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataImportStats {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

impl DataImportStats {
    pub fn display_string(&self) -> String {
        format!(
            "inserted: {}, already present: {}, failed: {}",
            self.inserted, self.skipped_existing, self.failed
        )
    }
}

/// Convert one cell to its column's storage type
///
/// Integer columns parse leniently: a fractional value keeps its integer
/// part, anything unparseable stores NULL.
fn coerce(column: &str, raw: Option<&str>) -> ColumnValue {
    if INTEGER_COLUMNS.contains(&column) {
        let parsed = raw.and_then(|v| {
            v.parse::<i64>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().map(|f| f as i64))
                .or_else(|| {
                    tracing::debug!(column = %column, value = %v, "Unparseable integer, storing NULL");
                    None
                })
        });
        ColumnValue::Integer(parsed)
    } else {
        ColumnValue::Text(raw.map(String::from))
    }
}

/// Import every source row into the music_files table
pub async fn import_music_files(
    pool: &SqlitePool,
    source: &TabularSource,
) -> Result<DataImportStats> {
    create_music_files_table(pool, source.columns()).await?;

    let mut stats = DataImportStats::default();
    let columns = source.columns().to_vec();

    for row in 0..source.row_count() {
        let values: Vec<ColumnValue> = columns
            .iter()
            .map(|column| coerce(column, source.trimmed_value(row, column)))
            .collect();

        match insert_music_file(pool, &columns, &values).await {
            Ok(true) => stats.inserted += 1,
            Ok(false) => stats.skipped_existing += 1,
            Err(e) => {
                tracing::warn!(row, error = %e, "Failed to import row");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(summary = %stats.display_string(), "Data import complete");
    Ok(stats)
}
