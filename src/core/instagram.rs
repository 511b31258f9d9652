//! Instagram posts - web session client and rate-limited fetch adapter
//!
//! The client speaks Instagram's web endpoints: a cookie-based login and the
//! GraphQL shortcode query. The adapter owns the authentication state, the
//! session artifacts and the backoff policy, and turns every failure into a
//! [`DownloadOutcome`].

use crate::core::downloader::skip_if_exists;
use crate::core::progress::ProgressReporter;
use crate::core::retry::{RetryPolicy, Sleeper};
use crate::error::{DownloaderError, Result};
use crate::storage::session::SessionStore;
use crate::types::{AuthState, DownloadOutcome, Post, PostKind, Session};
use crate::utils::filename::{partial_path, target_file_name};
use crate::utils::links::post_identifier;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{COOKIE, REFERER, SET_COOKIE};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BASE_URL: &str = "https://www.instagram.com";
const GRAPHQL_ENDPOINT: &str = "https://www.instagram.com/graphql/query";

/// Instagram web app id (public, embedded in the web app)
const IG_APP_ID: &str = "936619743392459";

/// Instagram collaborator
#[allow(async_fn_in_trait)]
pub trait PostClient {
    /// Reuse cookies from an earlier login
    fn restore_session(&mut self, session: &Session);

    /// Fresh login; rejected credentials are [`DownloaderError::InvalidCredentials`]
    async fn login(&mut self, username: &str, password: &str) -> Result<Session>;

    async fn fetch_post(&self, shortcode: &str) -> Result<Post>;

    async fn download_media(
        &self,
        media_url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()>;
}

// ============================================
// Web client
// ============================================

/// reqwest-backed [`PostClient`]
pub struct InstagramClient {
    http: reqwest::Client,
    cookies: BTreeMap<String, String>,
    doc_id: String,
}

impl InstagramClient {
    pub fn new(doc_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            cookies: BTreeMap::new(),
            doc_id: doc_id.into(),
        })
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn absorb_cookies(&mut self, response: &reqwest::Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            if let Some((name, value)) = value.to_str().ok().and_then(parse_set_cookie) {
                self.cookies.insert(name, value);
            }
        }
    }

    fn web_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder
            .header("X-IG-App-ID", IG_APP_ID)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, format!("{}/", BASE_URL))
            .header("Accept-Language", "en-US,en;q=0.9");
        if let Some(csrf) = self.cookies.get("csrftoken") {
            builder = builder.header("X-CSRFToken", csrf.as_str());
        }
        if !self.cookies.is_empty() {
            builder = builder.header(COOKIE, self.cookie_header());
        }
        builder
    }
}

impl PostClient for InstagramClient {
    fn restore_session(&mut self, session: &Session) {
        self.cookies = session.cookies.clone();
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        self.cookies.clear();

        // Landing page hands out the csrftoken cookie the login form needs
        let landing = self
            .http
            .get(format!("{}/accounts/login/", BASE_URL))
            .send()
            .await?;
        self.absorb_cookies(&landing);
        if !self.cookies.contains_key("csrftoken") {
            return Err(DownloaderError::Platform(
                "login page did not provide a CSRF token".into(),
            ));
        }

        let enc_password = format!(
            "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
            Utc::now().timestamp(),
            password
        );
        let body = format!(
            "username={}&enc_password={}&queryParams=%7B%7D&optIntoOneTap=false",
            urlencoding::encode(username),
            urlencoding::encode(&enc_password)
        );

        let response = self
            .web_request(
                self.http
                    .post(format!("{}/api/v1/web/accounts/login/ajax/", BASE_URL)),
            )
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(DownloaderError::RateLimited("login throttled (HTTP 429)".into()));
        }
        self.absorb_cookies(&response);

        let text = response.text().await?;
        let json: serde_json::Value = serde_json::from_str(&text).map_err(|_| {
            DownloaderError::Platform(format!("unexpected login response: {}", excerpt(&text)))
        })?;

        check_login_response(&json)?;

        Ok(Session {
            username: username.to_string(),
            cookies: self.cookies.clone(),
            saved_at: Utc::now().timestamp(),
        })
    }

    async fn fetch_post(&self, shortcode: &str) -> Result<Post> {
        let variables = format!(r#"{{"shortcode":"{}"}}"#, shortcode);
        let body = format!(
            "doc_id={}&variables={}",
            urlencoding::encode(&self.doc_id),
            urlencoding::encode(&variables)
        );

        let response = self
            .web_request(self.http.post(GRAPHQL_ENDPOINT))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DownloaderError::RateLimited(format!(
                "post {} throttled (HTTP 429)",
                shortcode
            )));
        }

        let text = response.text().await?;
        if !status.is_success() {
            // Throttling also shows up as 401/403 with a "please wait" body
            return Err(DownloaderError::Platform(format!(
                "HTTP {}: {}",
                status,
                excerpt(&text)
            )));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        parse_post(shortcode, &json)
    }

    async fn download_media(
        &self,
        media_url: &str,
        output: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        let mut response = self.http.get(media_url).send().await?;
        if !response.status().is_success() {
            return Err(DownloaderError::Platform(format!(
                "media download HTTP {}",
                response.status()
            )));
        }

        let total = response.content_length().filter(|t| *t > 0);
        let mut file = File::create(output).await?;
        let mut downloaded: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress.update(downloaded, total);
        }

        file.flush().await?;
        progress.finish();
        Ok(())
    }
}

/// `name=value` from a `Set-Cookie` header; expired/cleared cookies are dropped
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() || value == "\"\"" {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

fn check_login_response(json: &serde_json::Value) -> Result<()> {
    if json.get("authenticated").and_then(|v| v.as_bool()) == Some(true) {
        return Ok(());
    }
    if json.get("two_factor_required").and_then(|v| v.as_bool()) == Some(true) {
        return Err(DownloaderError::LoginRequired(
            "two-factor authentication is not supported".into(),
        ));
    }
    if json.get("checkpoint_url").is_some() {
        return Err(DownloaderError::LoginRequired(
            "Instagram requires a security checkpoint in the browser".into(),
        ));
    }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        if message.to_lowercase().contains("please wait") {
            return Err(DownloaderError::RateLimited(message.to_string()));
        }
    }
    Err(DownloaderError::InvalidCredentials)
}

/// Primary media of a GraphQL shortcode response; carousels yield their first item
fn parse_post(shortcode: &str, json: &serde_json::Value) -> Result<Post> {
    let media = json
        .pointer("/data/xdt_shortcode_media")
        .or_else(|| json.pointer("/data/shortcode_media"))
        .filter(|m| !m.is_null())
        .ok_or_else(|| {
            let message = json.get("message").and_then(|v| v.as_str()).unwrap_or("");
            if message.contains("login_required") || message.contains("checkpoint_required") {
                DownloaderError::LoginRequired("session expired, log in again".into())
            } else if message.is_empty() {
                DownloaderError::Platform("post not found or media unavailable".into())
            } else {
                DownloaderError::Platform(message.to_string())
            }
        })?;

    let node = media
        .pointer("/edge_sidecar_to_children/edges/0/node")
        .unwrap_or(media);

    let is_video = node.get("is_video").and_then(|v| v.as_bool()).unwrap_or(false);
    let (kind, url_key) = if is_video {
        (PostKind::Video, "video_url")
    } else {
        (PostKind::Image, "display_url")
    };

    let media_url = node
        .get(url_key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DownloaderError::Platform(format!("post {} has no {}", shortcode, url_key)))?
        .to_string();

    let owner = media
        .pointer("/owner/username")
        .and_then(|v| v.as_str())
        .unwrap_or("instagram")
        .to_string();

    Ok(Post {
        shortcode: shortcode.to_string(),
        kind,
        media_url,
        owner,
    })
}

fn excerpt(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].trim()
}

// ============================================
// Adapter
// ============================================

/// Authenticated, rate-limit-aware post downloader
pub struct InstagramAdapter<C, S> {
    client: C,
    sleeper: S,
    policy: RetryPolicy,
    sessions: SessionStore,
    state: AuthState,
    username: Option<String>,
}

impl<C: PostClient, S: Sleeper> InstagramAdapter<C, S> {
    pub fn new(client: C, sleeper: S, policy: RetryPolicy, sessions: SessionStore) -> Self {
        Self {
            client,
            sleeper,
            policy,
            sessions,
            state: AuthState::Unauthenticated,
            username: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Logged in as `username` and ready to fetch
    pub fn is_ready_for(&self, username: &str) -> bool {
        self.state == AuthState::SessionLoaded && self.username.as_deref() == Some(username)
    }

    /// Load the session artifact for `username`; false when there is none
    pub async fn restore(&mut self, username: &str) -> bool {
        match self.sessions.load(username).await {
            Some(session) => {
                self.client.restore_session(&session);
                self.username = Some(username.to_string());
                self.state = AuthState::SessionLoaded;
                tracing::debug!(username, "session artifact loaded");
                true
            }
            None => false,
        }
    }

    /// Fresh login, then persist the session artifact
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.state = AuthState::Unauthenticated;
        self.username = None;

        let session = self.client.login(username, password).await?;
        self.state = AuthState::Authenticated;
        self.username = Some(username.to_string());

        // The session is usable even if it could not be written
        if let Err(e) = self.sessions.save(&session).await {
            tracing::warn!(username, error = %e, "could not save session artifact");
        }
        self.state = AuthState::SessionLoaded;
        Ok(())
    }

    /// Forget the current login, e.g. after the server rejected the session
    pub fn reset(&mut self) {
        self.state = AuthState::Unauthenticated;
        self.username = None;
    }

    /// Download the post behind `url` into `dest_dir`.
    ///
    /// A rejected session is dropped along with its artifact, leaving the
    /// adapter `Unauthenticated` until the next login.
    pub async fn fetch_post(
        &mut self,
        url: &str,
        dest_dir: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> DownloadOutcome {
        match self.try_fetch_post(url, dest_dir, progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(url, error = ?e, "post download failed");
                if matches!(e, DownloaderError::LoginRequired(_)) {
                    self.expire_session().await;
                }
                DownloadOutcome::Failed(e.to_string())
            }
        }
    }

    async fn expire_session(&mut self) {
        if let Some(username) = self.username.clone() {
            if let Err(e) = self.sessions.remove(&username).await {
                tracing::warn!(username = %username, error = %e, "could not remove session artifact");
            }
        }
        self.reset();
    }

    async fn try_fetch_post(
        &self,
        url: &str,
        dest_dir: &Path,
        progress: &mut dyn ProgressReporter,
    ) -> Result<DownloadOutcome> {
        if self.state != AuthState::SessionLoaded {
            return Err(DownloaderError::LoginRequired("not logged in".into()));
        }

        let shortcode = post_identifier(url).ok_or_else(|| {
            DownloaderError::InvalidInput(format!("no post identifier in '{}'", url))
        })?;

        let client = &self.client;
        let id = shortcode.as_str();
        let post = self
            .policy
            .run(&self.sleeper, move |attempt| {
                tracing::debug!(shortcode = id, attempt, "fetching post metadata");
                client.fetch_post(id)
            })
            .await?;

        tracing::debug!(shortcode = %shortcode, owner = %post.owner, kind = post.kind.extension(), "post resolved");

        let target = dest_dir.join(target_file_name(&shortcode, post.kind.extension()));
        if let Some(skipped) = skip_if_exists(&target).await? {
            return Ok(skipped);
        }

        // Only complete files ever appear under the target name
        let partial = partial_path(&target);
        if let Err(e) = self
            .client
            .download_media(&post.media_url, &partial, progress)
            .await
        {
            if let Err(rm) = fs::remove_file(&partial).await {
                tracing::debug!(path = %partial.display(), error = %rm, "no partial file to remove");
            }
            return Err(e);
        }
        fs::rename(&partial, &target).await?;
        Ok(DownloadOutcome::Completed(target))
    }
}
