//! Imported tabular music data
//!
//! The `music_files` table mirrors the CSV source: its columns come from the
//! header row, so DDL and inserts are built dynamically. Identifiers are
//! validated before interpolation; values always go through bind parameters.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tagsync_common::{Error, Result};

use super::{is_unique_violation, validate_identifier};

pub const MUSIC_FILES_TABLE: &str = "music_files";

/// Column holding the source path, the natural join key between stores
pub const DIR_COLUMN: &str = "dir";

/// Columns stored as integers rather than text
pub const INTEGER_COLUMNS: &[&str] = &["bpm"];

/// A typed value for one dynamic column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    Integer(Option<i64>),
}

/// Create the music_files table from the source's column list, if absent
///
/// Every column is TEXT except the integer columns; `dir` carries the unique
/// constraint that makes re-imports idempotent.
pub async fn create_music_files_table(pool: &SqlitePool, columns: &[String]) -> Result<()> {
    if !columns.iter().any(|c| c == DIR_COLUMN) {
        return Err(Error::InvalidInput(format!(
            "source has no {:?} column",
            DIR_COLUMN
        )));
    }

    let mut ddl = format!("CREATE TABLE IF NOT EXISTS {} (", MUSIC_FILES_TABLE);
    for (i, column) in columns.iter().enumerate() {
        let name = validate_identifier(column)?;
        let sql_type = if INTEGER_COLUMNS.contains(&name) {
            "INTEGER"
        } else {
            "TEXT"
        };
        if i > 0 {
            ddl.push_str(", ");
        }
        ddl.push_str(name);
        ddl.push(' ');
        ddl.push_str(sql_type);
        if name == DIR_COLUMN {
            ddl.push_str(" UNIQUE");
        }
    }
    ddl.push(')');

    sqlx::query(&ddl).execute(pool).await?;
    Ok(())
}

/// Insert one row built from a column-name-to-value mapping
///
/// Returns false when the row's `dir` already exists (duplicate import),
/// true when a new row was written.
pub async fn insert_music_file(
    pool: &SqlitePool,
    columns: &[String],
    values: &[ColumnValue],
) -> Result<bool> {
    if columns.len() != values.len() {
        return Err(Error::Internal(format!(
            "column/value arity mismatch: {} columns, {} values",
            columns.len(),
            values.len()
        )));
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO {} (", MUSIC_FILES_TABLE));
    let mut names = builder.separated(", ");
    for column in columns {
        names.push(validate_identifier(column)?);
    }
    builder.push(") VALUES (");
    let mut binds = builder.separated(", ");
    for value in values {
        match value {
            ColumnValue::Text(text) => binds.push_bind(text.clone()),
            ColumnValue::Integer(int) => binds.push_bind(*int),
        };
    }
    builder.push(")");

    match builder.build().execute(pool).await {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Count imported rows
pub async fn count_music_files(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", MUSIC_FILES_TABLE))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
