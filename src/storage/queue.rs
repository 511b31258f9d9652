//! Pending downloads persisted between runs
//!
//! Plain UTF-8 text, one URL per line, no header. A missing file is an empty queue.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Flat-file store for URLs that have not finished downloading
#[derive(Debug, Clone)]
pub struct PendingQueue {
    path: PathBuf,
}

impl PendingQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted queue; blank lines are skipped, entries trimmed
    pub async fn load(&self) -> Result<Vec<String>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Overwrite the persisted queue with `links`, in order
    pub async fn save(&self, links: &[String]) -> Result<()> {
        let content: String = links.iter().map(|link| format!("{}\n", link)).collect();
        fs::write(&self.path, content).await?;
        tracing::debug!(path = %self.path.display(), count = links.len(), "saved pending queue");
        Ok(())
    }

    /// Delete the persisted queue if present
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `links`, or delete the file once nothing is left
    pub async fn sync(&self, links: &[String]) -> Result<()> {
        if links.is_empty() {
            self.clear().await
        } else {
            self.save(links).await
        }
    }
}
