//! Scripted collaborators for driving the controller

#![allow(dead_code)]

use content_downloader::core::extractor::MediaExtractor;
use content_downloader::core::instagram::{InstagramAdapter, PostClient};
use content_downloader::core::progress::ProgressReporter;
use content_downloader::core::retry::{RetryPolicy, TokioSleeper};
use content_downloader::error::{DownloaderError, Result};
use content_downloader::storage::queue::PendingQueue;
use content_downloader::storage::session::SessionStore;
use content_downloader::types::{MediaInfo, Post, PostKind, Session};
use content_downloader::ui::controller::Controller;
use content_downloader::ui::prompt::LineInput;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Answers prompts from a fixed script, then reports end of input
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LineInput for ScriptedInput {
    async fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    async fn read_secret(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// What the fake extractor saw
#[derive(Debug, Default)]
pub struct ExtractorLog {
    pub probed: Vec<String>,
    pub downloaded: Vec<String>,
    /// Queue file contents at each probe (None = no file)
    pub queue_at_probe: Vec<Option<String>>,
}

/// Titles each URL after its last path segment; fails URLs listed in `failing`
pub struct FakeExtractor {
    pub log: Rc<RefCell<ExtractorLog>>,
    pub failing: Vec<String>,
    pub queue_file: PathBuf,
}

impl FakeExtractor {
    pub fn new(queue_file: &Path) -> Self {
        Self {
            log: Rc::new(RefCell::new(ExtractorLog::default())),
            failing: Vec::new(),
            queue_file: queue_file.to_path_buf(),
        }
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }
}

impl MediaExtractor for FakeExtractor {
    async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let mut log = self.log.borrow_mut();
        log.probed.push(url.to_string());
        log.queue_at_probe
            .push(std::fs::read_to_string(&self.queue_file).ok());

        let name = url.rsplit('/').next().unwrap_or("video");
        Ok(MediaInfo {
            title: format!("clip {}", name),
            ext: "mp4".into(),
        })
    }

    async fn download(
        &self,
        url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        if self.failing.iter().any(|f| f == url) {
            return Err(DownloaderError::Extractor("HTTP Error 500".into()));
        }
        self.log.borrow_mut().downloaded.push(url.to_string());
        progress.update(4, Some(4));
        std::fs::write(output, b"data")?;
        progress.finish();
        Ok(())
    }
}

/// Instagram stand-in: one password, every post is a video
pub struct FakeClient {
    pub password: String,
    /// Fetches answered with "session expired" before posts resolve again
    pub expired_fetches: Cell<usize>,
}

impl FakeClient {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.into(),
            expired_fetches: Cell::new(0),
        }
    }

    pub fn expiring(self, fetches: usize) -> Self {
        self.expired_fetches.set(fetches);
        self
    }
}

impl PostClient for FakeClient {
    fn restore_session(&mut self, _session: &Session) {}

    async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        if password != self.password {
            return Err(DownloaderError::InvalidCredentials);
        }
        Ok(Session {
            username: username.to_string(),
            cookies: BTreeMap::from([("sessionid".to_string(), "abc".to_string())]),
            saved_at: 0,
        })
    }

    async fn fetch_post(&self, shortcode: &str) -> Result<Post> {
        if self.expired_fetches.get() > 0 {
            self.expired_fetches.set(self.expired_fetches.get() - 1);
            return Err(DownloaderError::LoginRequired(
                "session expired, log in again".into(),
            ));
        }
        Ok(Post {
            shortcode: shortcode.to_string(),
            kind: PostKind::Video,
            media_url: format!("https://cdn.test/{}.mp4", shortcode),
            owner: "someone".into(),
        })
    }

    async fn download_media(
        &self,
        _media_url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        std::fs::write(output, b"media")?;
        progress.finish();
        Ok(())
    }
}

pub type TestController = Controller<ScriptedInput, FakeExtractor, FakeClient, TokioSleeper>;

/// Temp workspace: `out/` for downloads, `pending.txt`, `sessions/`
pub struct Workspace {
    pub root: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("out")).unwrap();
        Self { root }
    }

    pub fn out(&self) -> PathBuf {
        self.root.path().join("out")
    }

    pub fn out_str(&self) -> String {
        self.out().to_string_lossy().to_string()
    }

    pub fn queue_file(&self) -> PathBuf {
        self.root.path().join("pending.txt")
    }

    pub fn sessions(&self) -> PathBuf {
        self.root.path().join("sessions")
    }

    pub fn controller(&self, input: ScriptedInput, extractor: FakeExtractor) -> TestController {
        self.controller_with_client(input, extractor, FakeClient::new("pw"))
    }

    pub fn controller_with_client(
        &self,
        input: ScriptedInput,
        extractor: FakeExtractor,
        client: FakeClient,
    ) -> TestController {
        let instagram = InstagramAdapter::new(
            client,
            TokioSleeper,
            RetryPolicy::default(),
            SessionStore::new(self.sessions()),
        );
        Controller::new(
            input,
            extractor,
            instagram,
            PendingQueue::new(self.queue_file()),
        )
    }
}
