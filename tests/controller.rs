mod common;

use common::{FakeClient, FakeExtractor, ScriptedInput, Workspace};
use content_downloader::storage::queue::PendingQueue;
use content_downloader::storage::session::SessionStore;
use content_downloader::types::{Session, SessionEnd};
use std::collections::BTreeMap;
use std::future::pending;

#[tokio::test]
async fn batch_urls_are_queued_before_download_and_cleared_after() {
    let ws = Workspace::new();
    let out = ws.out_str();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let input = ScriptedInput::new(&[
        out.as_str(),
        "batch",
        "http://x.test/1, http://x.test/2",
        "exit",
        "exit",
    ]);

    let mut controller = ws.controller(input, extractor);
    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Exited);
    let log = log.borrow();
    assert_eq!(log.downloaded, vec!["http://x.test/1", "http://x.test/2"]);
    // both URLs were on disk before the first transfer started
    assert_eq!(
        log.queue_at_probe[0].as_deref(),
        Some("http://x.test/1\nhttp://x.test/2\n")
    );
    assert_eq!(log.queue_at_probe[1].as_deref(), Some("http://x.test/2\n"));
    assert!(!ws.queue_file().exists());
    assert!(ws.out().join("clip 1.mp4").exists());
    assert!(ws.out().join("clip 2.mp4").exists());
}

#[tokio::test]
async fn pending_queue_is_drained_in_order_at_startup() {
    let ws = Workspace::new();
    PendingQueue::new(ws.queue_file())
        .save(&["http://a.test/a".to_string(), "http://b.test/b".to_string()])
        .await
        .unwrap();

    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let out = ws.out_str();
    let mut controller = ws.controller(ScriptedInput::new(&[out.as_str(), "exit"]), extractor);

    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert_eq!(log.borrow().downloaded, vec!["http://a.test/a", "http://b.test/b"]);
    assert!(!ws.queue_file().exists());
}

#[tokio::test]
async fn failed_download_stays_pending() {
    let ws = Workspace::new();
    let extractor = FakeExtractor::new(&ws.queue_file()).failing("http://x.test/2");
    let out = ws.out_str();
    let input = ScriptedInput::new(&[
        out.as_str(),
        "batch",
        "http://x.test/1,http://x.test/2,http://x.test/3",
        "exit",
        "exit",
    ]);

    let mut controller = ws.controller(input, extractor);
    controller.run(pending()).await.unwrap();

    assert_eq!(controller.pending(), ["http://x.test/2".to_string()]);
    let persisted = PendingQueue::new(ws.queue_file()).load().await.unwrap();
    assert_eq!(persisted, vec!["http://x.test/2"]);
}

#[tokio::test]
async fn existing_file_is_skipped_and_dequeued() {
    let ws = Workspace::new();
    std::fs::write(ws.out().join("clip 7.mp4"), b"old").unwrap();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let out = ws.out_str();
    let input = ScriptedInput::new(&[out.as_str(), "single", "http://x.test/7", "exit", "exit"]);

    let mut controller = ws.controller(input, extractor);
    controller.run(pending()).await.unwrap();

    assert_eq!(log.borrow().probed, vec!["http://x.test/7"]);
    assert!(log.borrow().downloaded.is_empty());
    assert!(!ws.queue_file().exists());
    assert_eq!(std::fs::read(ws.out().join("clip 7.mp4")).unwrap(), b"old");
}

#[tokio::test]
async fn invalid_input_is_reprompted() {
    let ws = Workspace::new();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let out = ws.out_str();
    let missing = ws.root.path().join("missing").to_string_lossy().to_string();
    let input = ScriptedInput::new(&[
        missing.as_str(),
        "",
        out.as_str(),
        "video",
        "SINGLE",
        "",
        "not a url",
        "http://x.test/9",
        "EXIT",
        "Exit",
    ]);

    let mut controller = ws.controller(input, extractor);
    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert_eq!(log.borrow().downloaded, vec!["http://x.test/9"]);
}

#[tokio::test]
async fn batch_with_no_valid_urls_queues_nothing() {
    let ws = Workspace::new();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let out = ws.out_str();
    let input = ScriptedInput::new(&[out.as_str(), "batch", "nope, , also-nope", "exit", "exit"]);

    let mut controller = ws.controller(input, extractor);
    controller.run(pending()).await.unwrap();

    assert!(log.borrow().probed.is_empty());
    assert!(!ws.queue_file().exists());
}

#[tokio::test]
async fn end_of_input_persists_pending_queue() {
    let ws = Workspace::new();
    let queued = vec!["http://a.test/a".to_string()];
    PendingQueue::new(ws.queue_file()).save(&queued).await.unwrap();

    // input ends at the directory prompt, before the queue is drained
    let extractor = FakeExtractor::new(&ws.queue_file());
    let mut controller = ws.controller(ScriptedInput::new(&[]), extractor);
    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Interrupted);
    assert_eq!(PendingQueue::new(ws.queue_file()).load().await.unwrap(), queued);
}

#[tokio::test]
async fn shutdown_signal_interrupts_and_persists() {
    let ws = Workspace::new();
    let queued = vec!["http://a.test/a".to_string(), "http://b.test/b".to_string()];
    PendingQueue::new(ws.queue_file()).save(&queued).await.unwrap();

    let extractor = FakeExtractor::new(&ws.queue_file());
    let out = ws.out_str();
    let mut controller = ws.controller(ScriptedInput::new(&[out.as_str()]), extractor);
    let end = controller.run(async {}).await.unwrap();

    assert_eq!(end, SessionEnd::Interrupted);
    assert_eq!(PendingQueue::new(ws.queue_file()).load().await.unwrap(), queued);
}

#[tokio::test]
async fn instagram_login_then_download() {
    let ws = Workspace::new();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let out = ws.out_str();
    let input = ScriptedInput::new(&[
        out.as_str(),
        "instagram",
        "alice",
        "pw",
        "https://www.instagram.com/p/AbC123/",
        "exit",
        "exit",
    ]);

    let mut controller = ws.controller(input, extractor);
    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert!(ws.out().join("AbC123.mp4").exists());
    assert!(SessionStore::new(ws.sessions()).load("alice").await.is_some());
}

#[tokio::test]
async fn instagram_reuses_saved_session() {
    let ws = Workspace::new();
    let out = ws.out_str();

    let first = ScriptedInput::new(&[out.as_str(), "instagram", "alice", "pw", "exit", "exit"]);
    ws.controller(first, FakeExtractor::new(&ws.queue_file()))
        .run(pending())
        .await
        .unwrap();

    // no password line: the artifact must be used
    let second = ScriptedInput::new(&[
        out.as_str(),
        "instagram",
        "alice",
        "https://www.instagram.com/reel/Zz9/",
        "exit",
        "exit",
    ]);
    let end = ws
        .controller(second, FakeExtractor::new(&ws.queue_file()))
        .run(pending())
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert!(ws.out().join("Zz9.mp4").exists());
}

#[tokio::test]
async fn instagram_invalid_credentials_returns_to_mode_prompt() {
    let ws = Workspace::new();
    let extractor = FakeExtractor::new(&ws.queue_file());
    let log = extractor.log.clone();
    let out = ws.out_str();
    let input = ScriptedInput::new(&[
        out.as_str(),
        "instagram",
        "alice",
        "wrong",
        "single",
        "http://x.test/1",
        "exit",
        "exit",
    ]);

    let mut controller = ws.controller(input, extractor);
    let end = controller.run(pending()).await.unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert!(SessionStore::new(ws.sessions()).load("alice").await.is_none());
    assert_eq!(log.borrow().downloaded, vec!["http://x.test/1"]);
}

#[tokio::test]
async fn instagram_expired_session_asks_for_password_again() {
    let ws = Workspace::new();
    let store = SessionStore::new(ws.sessions());
    store
        .save(&Session {
            username: "alice".into(),
            cookies: BTreeMap::from([("sessionid".to_string(), "stale".to_string())]),
            saved_at: 0,
        })
        .await
        .unwrap();

    let out = ws.out_str();
    let input = ScriptedInput::new(&[
        out.as_str(),
        "instagram",
        "alice",
        "https://www.instagram.com/p/Old1/",
        "pw",
        "https://www.instagram.com/p/Old1/",
        "exit",
        "exit",
    ]);
    let client = FakeClient::new("pw").expiring(1);

    let end = ws
        .controller_with_client(input, FakeExtractor::new(&ws.queue_file()), client)
        .run(pending())
        .await
        .unwrap();

    assert_eq!(end, SessionEnd::Exited);
    assert!(ws.out().join("Old1.mp4").exists());
    let saved = store.load("alice").await.unwrap();
    assert_eq!(saved.cookies.get("sessionid").map(String::as_str), Some("abc"));
}
