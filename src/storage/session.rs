//! Instagram session artifacts, one JSON file per username

use crate::error::Result;
use crate::types::Session;
use crate::utils::filename::sanitize_filename;
use crate::utils::paths::ensure_dir;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Session artifact store
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, username: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_filename(&username.to_lowercase())))
    }

    /// Load the artifact for `username`. Missing or unreadable artifacts yield `None`.
    pub async fn load(&self, username: &str) -> Option<Session> {
        let path = self.path_for(username);
        let content = fs::read_to_string(&path).await.ok()?;

        match serde_json::from_str::<Session>(&content) {
            Ok(session) if session.username.eq_ignore_ascii_case(username) => Some(session),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "session artifact belongs to another user");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt session artifact");
                None
            }
        }
    }

    /// Save the artifact after a fresh login
    pub async fn save(&self, session: &Session) -> Result<()> {
        ensure_dir(&self.dir).await?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(self.path_for(&session.username), content).await?;
        Ok(())
    }

    /// Forget a rejected session so the next run asks for credentials
    pub async fn remove(&self, username: &str) -> Result<()> {
        match fs::remove_file(self.path_for(username)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
