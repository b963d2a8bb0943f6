//! Data root resolution.

use std::env;
use std::fs;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable that overrides the data root.
pub const DATA_DIR_ENV: &str = "NYUUKIT_DATA_DIR";

/// Get the root directory for application data (config, downloads, tools).
///
/// Resolution order:
/// 1. `NYUUKIT_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/nyuukit`)
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(path) = env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
    let root = data_dir.join("nyuukit");

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| PathError::CreateFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(root)
}

/// Default location of the persisted poster configuration.
pub fn config_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("config.json"))
}

/// Directory where release archives are downloaded and extracted.
pub fn downloads_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("downloads"))
}
