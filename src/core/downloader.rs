//! Downloader module - probe, name, skip-or-transfer

use crate::core::extractor::MediaExtractor;
use crate::core::progress::ProgressReporter;
use crate::error::Result;
use crate::types::{DownloadOutcome, SkipReason};
use crate::utils::filename::target_file_name;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Download one URL into `dest_dir`.
///
/// Never fails: collaborator and filesystem errors come back as
/// [`DownloadOutcome::Failed`] so the caller can keep the URL pending.
pub async fn fetch<E: MediaExtractor>(
    extractor: &E,
    url: &str,
    dest_dir: &Path,
    progress: &mut dyn ProgressReporter,
) -> DownloadOutcome {
    match try_fetch(extractor, url, dest_dir, progress).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(url, error = ?e, "download failed");
            DownloadOutcome::Failed(e.to_string())
        }
    }
}

async fn try_fetch<E: MediaExtractor>(
    extractor: &E,
    url: &str,
    dest_dir: &Path,
    progress: &mut dyn ProgressReporter,
) -> Result<DownloadOutcome> {
    let info = extractor.probe(url).await?;
    let target = dest_dir.join(target_file_name(&info.title, &info.ext));

    if let Some(skipped) = skip_if_exists(&target).await? {
        return Ok(skipped);
    }

    extractor.download(url, &target, progress).await?;
    Ok(DownloadOutcome::Completed(target))
}

/// Name-based dedup: an existing file at `target` means "already downloaded"
pub(crate) async fn skip_if_exists(target: &Path) -> Result<Option<DownloadOutcome>> {
    if fs::try_exists(target).await? {
        tracing::info!(path = %target.display(), "target exists, skipping");
        return Ok(Some(DownloadOutcome::Skipped {
            reason: SkipReason::AlreadyExists,
            path: PathBuf::from(target),
        }));
    }
    Ok(None)
}
