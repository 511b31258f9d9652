//! Interactive session: directory, mode, URLs, downloads

use crate::core::downloader;
use crate::core::extractor::MediaExtractor;
use crate::core::instagram::{InstagramAdapter, PostClient};
use crate::core::progress::TransferProgress;
use crate::core::retry::Sleeper;
use crate::error::{DownloaderError, ErrorCode, Result};
use crate::storage::queue::PendingQueue;
use crate::types::{AppState, DownloadOutcome, Mode, SessionEnd};
use crate::ui::prompt::LineInput;
use crate::utils::links::{is_valid_url, post_identifier, split_batch};
use crate::utils::paths::is_existing_dir;
use colored::Colorize;
use std::future::Future;
use std::path::{Path, PathBuf};

const EXIT: &str = "exit";

/// Drives one interactive run.
///
/// Owns the in-memory pending queue; every change to it is written through
/// to the [`PendingQueue`] file before the next download starts.
pub struct Controller<I, E, C, S> {
    input: I,
    extractor: E,
    instagram: InstagramAdapter<C, S>,
    queue: PendingQueue,
    pending: Vec<String>,
    preset_dir: Option<PathBuf>,
    username: Option<String>,
}

impl<I, E, C, S> Controller<I, E, C, S>
where
    I: LineInput,
    E: MediaExtractor,
    C: PostClient,
    S: Sleeper,
{
    pub fn new(
        input: I,
        extractor: E,
        instagram: InstagramAdapter<C, S>,
        queue: PendingQueue,
    ) -> Self {
        Self {
            input,
            extractor,
            instagram,
            queue,
            pending: Vec::new(),
            preset_dir: None,
            username: None,
        }
    }

    /// Try this directory before prompting for one
    pub fn with_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.preset_dir = dir;
        self
    }

    /// Instagram account to use without asking
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// URLs not yet downloaded
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Run until `exit` at the mode prompt, end of input, or `shutdown` resolves.
    ///
    /// On interruption the pending queue is written out before returning.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SessionEnd>
    where
        F: Future<Output = ()>,
    {
        println!("{}", "Content Downloader with Auto-Resume Feature".bold());

        // Loaded before listening for interrupts; the interrupt path writes it back
        self.pending = self.queue.load().await?;
        if !self.pending.is_empty() {
            println!("Resuming {} pending downloads...", self.pending.len());
        }

        let result = tokio::select! {
            biased;
            _ = shutdown => Err(DownloaderError::Interrupted),
            r = self.drive() => r,
        };

        match result {
            Ok(()) => Ok(SessionEnd::Exited),
            Err(DownloaderError::Interrupted) => {
                println!();
                println!("{}", "Input interrupted. Exiting the downloader.".yellow());
                if let Err(e) = self.queue.sync(&self.pending).await {
                    tracing::error!(error = %e, "could not persist pending queue");
                    eprintln!("{} could not save pending downloads: {}", "Error:".red(), e);
                } else if !self.pending.is_empty() {
                    println!(
                        "{} pending download(s) saved to {}",
                        self.pending.len(),
                        self.queue.path().display()
                    );
                }
                Ok(SessionEnd::Interrupted)
            }
            Err(e) => Err(e),
        }
    }

    async fn drive(&mut self) -> Result<()> {
        let mut state = AppState::AwaitDirectory;
        let mut dest = PathBuf::new();

        while state != AppState::Exit {
            state = match state {
                AppState::AwaitDirectory => {
                    dest = self.prompt_directory().await?;
                    if !self.pending.is_empty() {
                        self.drain(&dest).await?;
                    }
                    AppState::AwaitMode
                }
                AppState::AwaitMode => self.prompt_mode().await?,
                AppState::SingleLoop => {
                    self.single_loop(&dest).await?;
                    AppState::AwaitMode
                }
                AppState::BatchLoop => {
                    self.batch_loop(&dest).await?;
                    AppState::AwaitMode
                }
                AppState::PlatformLoop => {
                    self.platform_loop(&dest).await?;
                    AppState::AwaitMode
                }
                AppState::Exit => break,
            };
        }

        println!("Exiting the downloader.");
        Ok(())
    }

    /// Next trimmed line; end of input counts as an interrupt
    async fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.input.read_line(prompt).await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(DownloaderError::Interrupted),
        }
    }

    async fn prompt_directory(&mut self) -> Result<PathBuf> {
        if let Some(dir) = self.preset_dir.take() {
            if is_existing_dir(&dir).await {
                return Ok(dir);
            }
            println!("{}", format!("'{}' is not a directory.", dir.display()).red());
        }

        loop {
            let input = self.ask("Enter the download path:").await?;
            let dir = PathBuf::from(&input);
            if !input.is_empty() && is_existing_dir(&dir).await {
                return Ok(dir);
            }
            println!("{}", "Invalid directory path. Please enter a valid path.".red());
        }
    }

    async fn prompt_mode(&mut self) -> Result<AppState> {
        let input = self
            .ask("Choose download mode (single/batch/instagram) or 'exit':")
            .await?;
        if input.eq_ignore_ascii_case(EXIT) {
            return Ok(AppState::Exit);
        }

        match input.parse::<Mode>() {
            Ok(mode) => {
                tracing::debug!(%mode, "mode selected");
                Ok(match mode {
                    Mode::Single => AppState::SingleLoop,
                    Mode::Batch => AppState::BatchLoop,
                    Mode::Instagram => AppState::PlatformLoop,
                })
            }
            Err(_) => {
                println!(
                    "{}",
                    "Invalid mode selected. Please choose 'single', 'batch' or 'instagram'.".red()
                );
                Ok(AppState::AwaitMode)
            }
        }
    }

    async fn single_loop(&mut self, dest: &Path) -> Result<()> {
        loop {
            let url = self
                .ask("Enter the URL of the video to download (or type 'exit' to go back):")
                .await?;
            if url.eq_ignore_ascii_case(EXIT) {
                return Ok(());
            }
            if url.is_empty() {
                println!("{}", "URL cannot be empty.".red());
                continue;
            }
            if !is_valid_url(&url) {
                println!("{}", "Invalid URL. Please enter a valid URL.".red());
                continue;
            }

            self.enqueue(std::slice::from_ref(&url)).await?;
            self.process(&url, dest).await?;
        }
    }

    async fn batch_loop(&mut self, dest: &Path) -> Result<()> {
        loop {
            let line = self
                .ask("Enter URLs of videos to download (separated by commas) or type 'exit' to go back:")
                .await?;
            if line.eq_ignore_ascii_case(EXIT) {
                return Ok(());
            }

            let (urls, rejected) = split_batch(&line);
            for bad in &rejected {
                println!("{}", format!("Invalid URL: {}. Skipping.", bad).yellow());
            }
            if urls.is_empty() {
                println!("{}", "No valid URLs provided.".red());
                continue;
            }

            self.enqueue(&urls).await?;

            let total = urls.len();
            println!("Total URLs to process: {}", total);
            for (index, url) in urls.iter().enumerate() {
                let index = index + 1;
                println!("{}", format!("Processing URL {}/{}: {}", index, total, url).dimmed());
                self.process(url, dest).await?;
                println!("{} links remaining.", total - index);
            }

            self.queue.sync(&self.pending).await?;
        }
    }

    async fn platform_loop(&mut self, dest: &Path) -> Result<()> {
        let username = match self.username.clone() {
            Some(name) => name,
            None => {
                let name = self.ask("Instagram username (or type 'exit' to go back):").await?;
                if name.is_empty() || name.eq_ignore_ascii_case(EXIT) {
                    return Ok(());
                }
                name
            }
        };

        if !self.authenticate(&username).await? {
            return Ok(());
        }
        self.username = Some(username.clone());

        loop {
            let url = self
                .ask("Enter the Instagram post URL (or type 'exit' to go back):")
                .await?;
            if url.eq_ignore_ascii_case(EXIT) {
                return Ok(());
            }
            if !is_valid_url(&url) || post_identifier(&url).is_none() {
                println!(
                    "{}",
                    "Invalid URL. Use a post link like https://www.instagram.com/p/<id>/".red()
                );
                continue;
            }

            println!("Processing URL: {}", url);
            let mut progress = TransferProgress::new("Downloading");
            let outcome = self.instagram.fetch_post(&url, dest, &mut progress).await;
            drop(progress);
            report(&outcome);

            if !self.instagram.is_ready_for(&username) {
                println!("{}", "Instagram session expired. Please log in again.".yellow());
                if !self.authenticate(&username).await? {
                    return Ok(());
                }
            }
        }
    }

    /// Reuse the current or saved session, else log in; false when login failed
    async fn authenticate(&mut self, username: &str) -> Result<bool> {
        if self.instagram.is_ready_for(username) || self.instagram.restore(username).await {
            return Ok(true);
        }

        let password = self
            .input
            .read_secret(&format!("Password for {}", username))
            .await?
            .ok_or(DownloaderError::Interrupted)?;

        match self.instagram.login(username, &password).await {
            Ok(()) => {
                println!("{}", format!("Logged in as {}.", username).green());
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(username, error = %e, "login failed");
                println!("{} {}", "Login failed:".red(), e);
                match e.code() {
                    ErrorCode::RateLimited => println!(
                        "{}",
                        "Instagram is throttling logins. Wait a few minutes before trying again."
                            .yellow()
                    ),
                    ErrorCode::InvalidCredentials => {
                        println!("{}", "Check the username and password.".yellow())
                    }
                    _ => {}
                }
                Ok(false)
            }
        }
    }

    /// Process every entry that was pending at startup, once
    async fn drain(&mut self, dest: &Path) -> Result<()> {
        let snapshot = self.pending.clone();
        for url in &snapshot {
            self.process(url, dest).await?;
        }

        if self.pending.is_empty() {
            self.queue.clear().await?;
            println!("{}", "All pending downloads completed!".green());
        } else {
            self.queue.save(&self.pending).await?;
            println!(
                "{}",
                format!("{} download(s) failed and remain pending.", self.pending.len()).yellow()
            );
        }
        Ok(())
    }

    async fn enqueue(&mut self, urls: &[String]) -> Result<()> {
        self.pending.extend(urls.iter().cloned());
        self.queue.save(&self.pending).await
    }

    /// Download one URL and reconcile the queue with the outcome
    async fn process(&mut self, url: &str, dest: &Path) -> Result<()> {
        println!("Processing URL: {}", url);

        let mut progress = TransferProgress::new("Downloading");
        let outcome = downloader::fetch(&self.extractor, url, dest, &mut progress).await;
        drop(progress);

        report(&outcome);
        if outcome.is_done() {
            if let Some(pos) = self.pending.iter().position(|p| p == url) {
                self.pending.remove(pos);
                self.queue.sync(&self.pending).await?;
            }
        }
        Ok(())
    }
}

fn report(outcome: &DownloadOutcome) {
    match outcome {
        DownloadOutcome::Completed(path) => {
            println!("{} {}", "✓ Download complete:".green(), display_name(path));
        }
        DownloadOutcome::Skipped { path, .. } => {
            println!(
                "{}",
                format!(
                    "The file '{}' already exists. Skipping download.",
                    display_name(path)
                )
                .yellow()
            );
        }
        DownloadOutcome::Failed(message) => {
            eprintln!("{} {}", "An error occurred:".red(), message);
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
