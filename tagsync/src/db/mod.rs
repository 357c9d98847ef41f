//! Database access for tagsync
//!
//! Local SQLite mirror of the tagging taxonomy. The schema is created
//! idempotently before any data operation; all values go through bind
//! parameters, and the few places that interpolate identifiers validate
//! them first.

pub mod admin;
pub mod items;
pub mod music_files;
pub mod taxonomy;

use sqlx::SqlitePool;
use std::path::Path;
use tagsync_common::{Error, Result};

/// Mirror tables in dependency order: associations first, then leaf
/// entities, then groups. Deletion must walk this order.
pub const MIRROR_TABLES: &[&str] = &[
    "topic_items",
    "item_tags",
    "items",
    "topic_tag_groups",
    "topics",
    "tag_group_tags",
    "tags",
    "tag_groups",
];

/// Initialize database connection pool and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url)
        .await
        .map_err(|e| Error::Connection(format!("{}: {}", db_path.display(), e)))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the taxonomy schema if it does not exist
///
/// Table and column names mirror the tagging server's resource model.
/// `music_files` is not created here; the data importer derives its columns
/// from the tabular source.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS tag_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            group_id INTEGER REFERENCES tag_groups(id) ON DELETE CASCADE,
            description TEXT,
            UNIQUE (group_id, name)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS tag_group_tags (
            tag_group_id INTEGER NOT NULL REFERENCES tag_groups(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (tag_group_id, tag_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_tag_groups (
            topic_id INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            tag_group_id INTEGER NOT NULL REFERENCES tag_groups(id) ON DELETE CASCADE,
            PRIMARY KEY (topic_id, tag_group_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            link TEXT,
            image_url TEXT,
            type TEXT NOT NULL DEFAULT 'file'
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS item_tags (
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, tag_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS topic_items (
            topic_id INTEGER NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            PRIMARY KEY (topic_id, item_id)
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!("Taxonomy tables initialized");

    Ok(())
}

/// Validate a SQL identifier before interpolating it into DDL/DML
///
/// Values never go through this path; only table and column names derived
/// from configuration or CSV headers do.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= 64
        }
        None => false,
    };

    if valid {
        Ok(name)
    } else {
        Err(Error::InvalidInput(format!(
            "invalid SQL identifier: {:?}",
            name
        )))
    }
}

/// Count rows in one of the mirror tables
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    if !MIRROR_TABLES.contains(&table) {
        return Err(Error::InvalidInput(format!("unknown table: {:?}", table)));
    }
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Clear all mirror tables in dependency order
pub async fn clear_mirror_tables(pool: &SqlitePool) -> Result<()> {
    for table in MIRROR_TABLES {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(pool)
            .await?;
    }
    tracing::info!("Cleared local mirror tables");
    Ok(())
}

/// True if the error is a unique-constraint violation (duplicate insert)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
