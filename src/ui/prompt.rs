//! Line-based terminal input

use crate::error::{DownloaderError, Result};
use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Source of operator input, one line per prompt.
///
/// `Ok(None)` means input has ended (stdin closed).
#[allow(async_fn_in_trait)]
pub trait LineInput {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Like `read_line`, without echoing what is typed
    async fn read_secret(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Async stdin reader.
///
/// Reading asynchronously keeps the task responsive to Ctrl-C while it waits.
pub struct StdinInput {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

impl LineInput for StdinInput {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{} ", prompt.bold());
        std::io::stdout().flush().ok();
        Ok(self.lines.next_line().await?)
    }

    async fn read_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        let prompt = prompt.to_string();
        let secret = tokio::task::spawn_blocking(move || {
            dialoguer::Password::new().with_prompt(prompt).interact()
        })
        .await
        .map_err(|_| DownloaderError::Interrupted)?;

        match secret {
            Ok(secret) => Ok(Some(secret)),
            Err(e) => Err(DownloaderError::File(std::io::Error::other(e))),
        }
    }
}
