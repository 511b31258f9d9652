//! Extractor module - yt-dlp integration

use crate::core::progress::ProgressReporter;
use crate::error::{DownloaderError, Result};
use crate::types::MediaInfo;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Prefix of the lines produced by our `--progress-template`
const PROGRESS_PREFIX: &str = "progress:";

/// downloaded/total/estimate, yt-dlp prints `NA` for unknown fields
static PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^progress:(\d+|NA)/(\d+|NA)/(\d+(?:\.\d+)?|NA)$").expect("valid progress regex")
});

/// Media extraction collaborator.
///
/// Probing must not transfer anything; downloading writes exactly to `output`.
#[allow(async_fn_in_trait)]
pub trait MediaExtractor {
    async fn probe(&self, url: &str) -> Result<MediaInfo>;

    async fn download(
        &self,
        url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()>;
}

/// yt-dlp subprocess wrapper
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    format: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    async fn ensure_available(&self) -> Result<()> {
        let found = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false);

        if found {
            Ok(())
        } else {
            Err(DownloaderError::MissingDependency(self.program.clone()))
        }
    }

    fn probe_args<'a>(&'a self, url: &'a str) -> Vec<&'a str> {
        vec![
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            "--format",
            self.format.as_str(),
            url,
        ]
    }

    fn download_args<'a>(&'a self, url: &'a str, template: &'a str) -> Vec<&'a str> {
        vec![
            "--format",
            self.format.as_str(),
            "--no-playlist",
            "--no-warnings",
            "--no-write-info-json",
            "--progress",
            "--newline",
            "--progress-template",
            "download:progress:%(progress.downloaded_bytes)s/%(progress.total_bytes)s/%(progress.total_bytes_estimate)s",
            "--output",
            template,
            url,
        ]
    }
}

impl MediaExtractor for YtDlp {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        self.ensure_available().await?;
        tracing::debug!(url, "probing metadata");

        let output = Command::new(&self.program)
            .args(self.probe_args(url))
            .output()
            .await
            .map_err(|e| DownloaderError::Extractor(format!("Failed to start yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(DownloaderError::Extractor(error_message(
                &String::from_utf8_lossy(&output.stderr),
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn download(
        &self,
        url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        self.ensure_available().await?;

        let template = escape_template(&output.to_string_lossy());
        tracing::debug!(url, output = %output.display(), "starting transfer");

        let mut child = Command::new(&self.program)
            .args(self.download_args(url, &template))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloaderError::Extractor(format!("Failed to start yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloaderError::Extractor("yt-dlp stdout unavailable".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloaderError::Extractor("yt-dlp stderr unavailable".into()))?;

        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some((downloaded, total)) = parse_progress_line(&line) {
                progress.update(downloaded, total);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(DownloaderError::Extractor(error_message(&stderr)));
        }

        progress.finish();
        Ok(())
    }
}

/// Parse one `progress:` line into (downloaded, total)
fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let line = line.trim();
    if !line.starts_with(PROGRESS_PREFIX) {
        return None;
    }

    let caps = PROGRESS_RE.captures(line)?;
    let downloaded = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let total = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .or_else(|| {
            caps.get(3)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .map(|estimate| estimate as u64)
        })
        .filter(|total| *total > 0);

    Some((downloaded, total))
}

/// Literal path as an output template
fn escape_template(path: &str) -> String {
    path.replace('%', "%%")
}

/// Last `ERROR:` line of yt-dlp's stderr, or the trimmed tail of it
fn error_message(stderr: &str) -> String {
    let last_error = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"));

    match last_error {
        Some(line) => line.trim_start_matches("ERROR:").trim().to_string(),
        None => {
            let trimmed = stderr.trim();
            if trimmed.is_empty() {
                "yt-dlp exited with an error".into()
            } else {
                let start = trimmed
                    .char_indices()
                    .rev()
                    .nth(299)
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                trimmed[start..].to_string()
            }
        }
    }
}
