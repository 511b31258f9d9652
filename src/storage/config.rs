//! Configuration management

use crate::error::{DownloaderError, Result};
use crate::types::Config;
use crate::utils::paths::{ensure_dir, get_config_dir, get_config_path, get_sessions_dir};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Load configuration from the default location, defaults when absent
pub async fn load_config() -> Result<Config> {
    load_config_from(&get_config_path()).await
}

/// Load configuration from `path`; keys missing from the file keep their defaults.
///
/// Values are not validated here: command-line overrides may still replace them.
pub async fn load_config_from(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Save configuration to file
pub async fn save_config(config: &Config) -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(get_config_path(), content).await?;
    Ok(())
}

/// Reject values the retry loop cannot work with
pub fn validate(config: &Config) -> Result<()> {
    if !(config.backoff_factor.is_finite() && config.backoff_factor >= 1.0) {
        return Err(DownloaderError::InvalidInput(format!(
            "backoff_factor must be >= 1, got {}",
            config.backoff_factor
        )));
    }
    if config.max_retries == 0 {
        return Err(DownloaderError::InvalidInput(
            "max_retries must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Resolved session artifact directory
pub fn sessions_dir(config: &Config) -> PathBuf {
    if config.sessions_dir.is_empty() {
        get_sessions_dir()
    } else {
        PathBuf::from(&config.sessions_dir)
    }
}
