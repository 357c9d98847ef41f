//! Configuration loading and data folder resolution
//!
//! Connection parameters are externally injected; resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use std::path::PathBuf;

/// Environment variable naming the data folder holding the SQLite databases
pub const DATA_DIR_ENV: &str = "TAGSYNC_DATA";

/// Environment variable naming the tagging server base URL
pub const SERVER_URL_ENV: &str = "TAGSYNC_SERVER";

/// Default tagging server base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Name of the database the import and reconciliation passes target by default
pub const DEFAULT_DATABASE: &str = "tagging";

/// Resolve the data folder holding the local SQLite databases
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(value) = read_config_key("data_dir") {
        return PathBuf::from(value);
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Resolve the tagging server base URL, with any trailing slash stripped
pub fn resolve_server_url(cli_arg: Option<&str>) -> String {
    let raw = if let Some(url) = cli_arg {
        url.to_string()
    } else if let Ok(url) = std::env::var(SERVER_URL_ENV) {
        if url.is_empty() {
            read_config_key("server_url").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
        } else {
            url
        }
    } else if let Some(url) = read_config_key("server_url") {
        url
    } else {
        DEFAULT_SERVER_URL.to_string()
    };

    raw.trim_end_matches('/').to_string()
}

/// Read a string key from the config file, if the file and key exist
fn read_config_key(key: &str) -> Option<String> {
    let path = config_file_path().ok()?;
    let content = std::fs::read_to_string(path).ok()?;
    let config = toml::from_str::<toml::Value>(&content).ok()?;
    config.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Get the configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("tagsync").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        return Ok(user_config);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tagsync/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config(format!(
        "Config file not found: {}",
        user_config.display()
    )))
}

/// Get OS-dependent default data folder path
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tagsync"))
        .unwrap_or_else(|| PathBuf::from("./tagsync_data"))
}
