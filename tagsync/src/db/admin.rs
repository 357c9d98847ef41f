//! Administrative database operations
//!
//! Kept separate from per-database query operations: each admin call opens
//! its own connection and closes it on every exit path. A "database" is a
//! `.db` file under the data folder, so existence checks are synchronous
//! preconditions rather than races against other writers.

use sqlx::{Connection, SqliteConnection};
use std::path::{Path, PathBuf};
use tagsync_common::{Error, Result};

use super::validate_identifier;

/// Path of the named database file under the data folder
pub fn database_path(data_dir: &Path, name: &str) -> Result<PathBuf> {
    validate_identifier(name)?;
    Ok(data_dir.join(format!("{}.db", name)))
}

/// List all databases in the data folder, sorted by name
pub async fn list_databases(data_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();

    if !data_dir.exists() {
        return Ok(names);
    }

    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("db") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Check whether the named database exists
pub async fn database_exists(data_dir: &Path, name: &str) -> Result<bool> {
    Ok(database_path(data_dir, name)?.exists())
}

/// Create a new empty database
///
/// Fails with a Conflict error if the database already exists.
pub async fn create_database(data_dir: &Path, name: &str) -> Result<PathBuf> {
    let path = database_path(data_dir, name)?;
    if path.exists() {
        return Err(Error::Conflict(format!(
            "database \"{}\" already exists",
            name
        )));
    }

    std::fs::create_dir_all(data_dir)?;

    let url = format!("sqlite://{}?mode=rwc", path.display());
    let conn = SqliteConnection::connect(&url)
        .await
        .map_err(|e| Error::Connection(format!("{}: {}", path.display(), e)))?;
    conn.close().await?;

    tracing::info!(database = name, path = %path.display(), "Database created");
    Ok(path)
}

/// Drop a database and its SQLite sidecar files
///
/// Fails with a NotFound error if the database does not exist.
pub async fn drop_database(data_dir: &Path, name: &str) -> Result<()> {
    let path = database_path(data_dir, name)?;
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "database \"{}\" does not exist",
            name
        )));
    }

    std::fs::remove_file(&path)?;
    for suffix in ["-wal", "-shm"] {
        let sidecar = PathBuf::from(format!("{}{}", path.display(), suffix));
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }
    }

    tracing::info!(database = name, "Database dropped");
    Ok(())
}
