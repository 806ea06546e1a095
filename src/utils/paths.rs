//! Path Utilities
//!
//! Resolves the settings directory and per-document report artifacts.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Suffix appended to a document path to name its report
pub const REPORT_SUFFIX: &str = ".report.md";

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Autokaker directory (~/.autokaker/)
pub fn autokaker_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".autokaker"))
}

/// Get the config file path (~/.autokaker/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(autokaker_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Report artifact for a document: `<documentPath>.report.md`
pub fn report_path(document: &Path) -> PathBuf {
    let mut name = document.as_os_str().to_owned();
    name.push(REPORT_SUFFIX);
    PathBuf::from(name)
}
