//! Transfer progress reporting

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Sink for byte-level progress of one transfer.
///
/// Display only; nothing reads these values back.
pub trait ProgressReporter {
    /// Cumulative bytes so far, and the total when the source knows it
    fn update(&mut self, downloaded: u64, total: Option<u64>);

    /// Transfer finished
    fn finish(&mut self);
}

/// Reporter that drops every event
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn update(&mut self, _downloaded: u64, _total: Option<u64>) {}

    fn finish(&mut self) {}
}

/// Terminal progress bar for one transfer.
///
/// Starts as nothing and becomes a byte bar once a total is known, or a
/// spinner with a byte counter when it never is. Dropping an unfinished
/// reporter clears whatever it drew.
pub struct TransferProgress {
    bar: Option<ProgressBar>,
    determinate: bool,
    label: String,
}

impl TransferProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            bar: None,
            determinate: false,
            label: label.into(),
        }
    }

    fn bar_for(&mut self, total: Option<u64>) -> &ProgressBar {
        let wants_bar = total.is_some();
        if self.bar.is_none() || (wants_bar && !self.determinate) {
            if let Some(old) = self.bar.take() {
                old.finish_and_clear();
            }
            let bar = match total {
                Some(total) => {
                    let bar = ProgressBar::new(total);
                    if let Ok(style) = ProgressStyle::default_bar().template(
                        "{msg} [{bar:30.green/white}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    ) {
                        bar.set_style(style.progress_chars("=> "));
                    }
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                        bar.set_style(style);
                    }
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                }
            };
            bar.set_message(self.label.clone());
            self.determinate = wants_bar;
            self.bar = Some(bar);
        }
        // Set just above; the branch always leaves a bar in place.
        self.bar.get_or_insert_with(ProgressBar::hidden)
    }
}

impl ProgressReporter for TransferProgress {
    fn update(&mut self, downloaded: u64, total: Option<u64>) {
        let label = self.label.clone();
        let bar = self.bar_for(total);
        match total {
            Some(total) => {
                if bar.length() != Some(total) {
                    bar.set_length(total);
                }
                bar.set_position(downloaded);
            }
            None => bar.set_message(format!(
                "{} {} (unable to determine total size)",
                label,
                HumanBytes(downloaded)
            )),
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
