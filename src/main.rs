//! content-downloader - videos and Instagram posts from your terminal
//!
//! An interactive CLI that downloads through yt-dlp or an Instagram session
//! and remembers unfinished downloads between runs.

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use content_downloader::core::extractor::YtDlp;
use content_downloader::core::instagram::{InstagramAdapter, InstagramClient};
use content_downloader::core::retry::{RetryPolicy, TokioSleeper};
use content_downloader::storage::config;
use content_downloader::storage::queue::PendingQueue;
use content_downloader::storage::session::SessionStore;
use content_downloader::types::{Config, SessionEnd};
use content_downloader::ui::controller::Controller;
use content_downloader::ui::prompt::StdinInput;
use content_downloader::utils::logging::init_tracing;
use content_downloader::utils::paths::get_config_path;

/// Download videos and Instagram posts, with auto-resume.
#[derive(Parser, Debug)]
#[command(name = "content-downloader")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Download directory (prompted for when missing or invalid)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Pending-downloads file
    #[arg(long)]
    queue_file: Option<String>,

    /// Instagram account to log in with
    #[arg(short, long)]
    username: Option<String>,

    /// Base of the rate-limit backoff (seconds = factor^attempt)
    #[arg(long)]
    backoff_factor: Option<f64>,

    /// Rate-limited attempts before giving up on a post
    #[arg(long)]
    max_retries: Option<u32>,

    /// Path to the yt-dlp executable
    #[arg(long)]
    ytdlp: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Write a default configuration file and exit
    #[arg(long)]
    init_config: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// CLI flags take precedence over the config file
fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(ref queue_file) = cli.queue_file {
        cfg.queue_file = queue_file.clone();
    }
    if let Some(ref username) = cli.username {
        cfg.instagram_username = Some(username.clone());
    }
    if let Some(factor) = cli.backoff_factor {
        cfg.backoff_factor = factor;
    }
    if let Some(retries) = cli.max_retries {
        cfg.max_retries = retries;
    }
    if let Some(ref ytdlp) = cli.ytdlp {
        cfg.ytdlp_path = ytdlp.clone();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.init_config {
        config::save_config(&Config::default()).await?;
        println!("{} {}", "Wrote".green(), get_config_path().display());
        return Ok(());
    }

    let mut cfg = config::load_config().await?;
    apply_overrides(&mut cfg, &cli);
    config::validate(&cfg)?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let extractor = YtDlp::new(&cfg.ytdlp_path, &cfg.format);
    let instagram = InstagramAdapter::new(
        InstagramClient::new(&cfg.instagram_doc_id)?,
        TokioSleeper,
        RetryPolicy::new(cfg.backoff_factor, cfg.max_retries),
        SessionStore::new(config::sessions_dir(&cfg)),
    );

    let mut controller = Controller::new(
        StdinInput::new(),
        extractor,
        instagram,
        PendingQueue::new(&cfg.queue_file),
    )
    .with_directory(cli.dir)
    .with_username(cfg.instagram_username.clone());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    if controller.run(shutdown).await? == SessionEnd::Interrupted {
        // tokio's stdin reader is stuck in a blocking read that runtime shutdown would wait on
        std::process::exit(0);
    }

    Ok(())
}
