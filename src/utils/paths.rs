//! Path utilities for content-downloader
//!
//! Respects XDG Base Directory Specification

use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;

const APP_NAME: &str = "content-downloader";

/// Get config directory path
/// Respects XDG_CONFIG_HOME, defaults to ~/.config/content-downloader
pub fn get_config_dir() -> PathBuf {
    let base = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::config_dir().unwrap_or_else(|| {
                PathBuf::from(env::var("HOME").unwrap_or_default()).join(".config")
            })
        });

    base.join(APP_NAME)
}

/// Get config file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Default session artifact directory
pub fn get_sessions_dir() -> PathBuf {
    get_config_dir().join("sessions")
}

/// Check that a path names an existing directory
pub async fn is_existing_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Ensure a directory exists
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}
