//! Error types for content-downloader

use thiserror::Error;

/// Message fragments the Instagram web API uses when it throttles a client.
/// Only consulted when a failure did not arrive as [`DownloaderError::RateLimited`].
/// Bare status digits are not enough: shortcodes and JSON offsets contain them too.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "please wait a few minutes",
    "http 429",
    "429 too many requests",
    "rate limit",
];

/// Coarse error classes, one per recovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Re-prompt the operator
    InvalidInput,
    /// Back off and retry
    RateLimited,
    /// Abort the login flow, keep the session loop running
    InvalidCredentials,
    /// Log, keep the URL pending, move on
    TransferFailure,
    /// Persist pending state and exit
    Interrupted,
}

/// Main error type for content-downloader
#[derive(Error, Debug)]
pub enum DownloaderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing dependency: {0}. Please install it.")]
    MissingDependency(String),

    #[error("Extractor error: {0}")]
    Extractor(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Gave up after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Login required: {0}")]
    LoginRequired(String),

    #[error("Instagram error: {0}")]
    Platform(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DownloaderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::RateLimited(_) => ErrorCode::RateLimited,
            Self::InvalidCredentials | Self::LoginRequired(_) => ErrorCode::InvalidCredentials,
            Self::Interrupted => ErrorCode::Interrupted,
            Self::MissingDependency(_)
            | Self::Extractor(_)
            | Self::RetriesExhausted { .. }
            | Self::Platform(_)
            | Self::File(_)
            | Self::Http(_)
            | Self::Json(_) => ErrorCode::TransferFailure,
        }
    }

    /// Whether this failure means "slow down".
    ///
    /// The structured variant wins; otherwise the rendered message is searched
    /// for the wording Instagram uses, since some throttling responses arrive
    /// as ordinary failures with a 4xx status and a text body.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::RetriesExhausted { .. } | Self::InvalidCredentials | Self::Interrupted => false,
            other => {
                let message = other.to_string().to_lowercase();
                RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DownloaderError>;
