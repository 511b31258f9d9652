//! Type definitions for content-downloader
//!
//! Source of truth for all data structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::DownloaderError;

// ============================================
// Download Types
// ============================================

/// Metadata probed from the extractor before any transfer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaInfo {
    #[serde(default = "default_title")]
    pub title: String,
    /// Container extension of the selected format, e.g. "mp4", "webm"
    #[serde(default = "default_ext")]
    pub ext: String,
}

fn default_title() -> String {
    "video".into()
}

fn default_ext() -> String {
    "mp4".into()
}

/// Why a URL was not transferred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A file with the computed name is already in the destination
    AlreadyExists,
}

/// Result of processing one URL. Failures are values, never panics or early returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed(PathBuf),
    Skipped { reason: SkipReason, path: PathBuf },
    Failed(String),
}

impl DownloadOutcome {
    /// True when the URL needs no further attempts
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

// ============================================
// Instagram Types
// ============================================

/// Content kind of a post's primary media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Video,
    Image,
}

impl PostKind {
    pub fn extension(self) -> &'static str {
        match self {
            PostKind::Video => "mp4",
            PostKind::Image => "jpg",
        }
    }
}

/// Post metadata resolved from a shortcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub shortcode: String,
    pub kind: PostKind,
    /// Direct URL of the media file
    pub media_url: String,
    pub owner: String,
}

/// Persisted login cookies for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub cookies: BTreeMap<String, String>,
    /// Unix timestamp of the login that produced these cookies
    pub saved_at: i64,
}

/// Authentication progress of the platform adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Fresh login succeeded, session artifact not yet written
    Authenticated,
    /// Ready to fetch posts
    SessionLoaded,
}

// ============================================
// Config Types
// ============================================

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// yt-dlp executable (name on PATH or absolute path)
    pub ytdlp_path: String,
    /// yt-dlp format selector
    pub format: String,
    /// Pending-queue file
    pub queue_file: String,
    /// Base of the rate-limit wait: factor^attempt seconds
    pub backoff_factor: f64,
    /// Rate-limited attempts before giving up on a post
    pub max_retries: u32,
    /// Instagram account used for the session artifact
    pub instagram_username: Option<String>,
    /// GraphQL document id for shortcode queries (Instagram rotates it)
    pub instagram_doc_id: String,
    /// Directory holding session artifacts; empty = <config dir>/sessions
    pub sessions_dir: String,
}

pub const DEFAULT_FORMAT: &str = "bestvideo[height>=1080]+bestaudio/best[height>=1080]/best";
pub const DEFAULT_QUEUE_FILE: &str = "pending_downloads.txt";
pub const DEFAULT_DOC_ID: &str = "8845758582119845";

impl Default for Config {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".into(),
            format: DEFAULT_FORMAT.into(),
            queue_file: DEFAULT_QUEUE_FILE.into(),
            backoff_factor: 2.0,
            max_retries: 5,
            instagram_username: None,
            instagram_doc_id: DEFAULT_DOC_ID.into(),
            sessions_dir: String::new(),
        }
    }
}

// ============================================
// Session Controller Types
// ============================================

/// Download mode picked at the mode prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Batch,
    Instagram,
}

impl FromStr for Mode {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(Mode::Single),
            "batch" => Ok(Mode::Batch),
            "instagram" => Ok(Mode::Instagram),
            other => Err(DownloaderError::InvalidInput(format!("unknown mode '{}'", other))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Single => "single",
            Mode::Batch => "batch",
            Mode::Instagram => "instagram",
        };
        f.write_str(name)
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    AwaitDirectory,
    AwaitMode,
    SingleLoop,
    BatchLoop,
    PlatformLoop,
    /// `exit` at the mode prompt
    Exit,
}

/// How a controller run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exited,
    /// Signal or end of input; pending state was persisted
    Interrupted,
}
