//! Store operations over the embedded fjall adapter

use std::sync::Arc;
use std::time::Duration;
use streamline_store::{FjallEngine, Line, LogEngine, LogStore, StoreConfig, TtlState};

fn quick_config() -> StoreConfig {
    StoreConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_tail_max_duration(Duration::from_millis(300))
}

#[tokio::test]
async fn full_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FjallEngine::open(dir.path()).unwrap());
    let store = LogStore::new(engine.clone(), quick_config()).unwrap();

    store.create("build-1").await.unwrap();
    store
        .write("build-1", &[Line::from("l1"), Line::from("l2")])
        .await
        .unwrap();

    let mut out = Vec::new();
    store.copy_to("build-1", &mut out).await.unwrap();
    assert_eq!(out, b"l1\nl2\n");

    assert!(matches!(
        engine.ttl("build-1").await.unwrap(),
        TtlState::Set(_)
    ));

    store.delete("build-1").await.unwrap();
    assert!(store.exists("build-1").await.is_err());
}

#[tokio::test]
async fn tail_works_against_disk() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FjallEngine::open(dir.path()).unwrap());
    let store = LogStore::new(engine, quick_config()).unwrap();

    store.create("build-1").await.unwrap();
    store
        .write("build-1", &[Line::from("a"), Line::from("b")])
        .await
        .unwrap();

    let mut session = store.tail("build-1").await.unwrap();
    let mut lines = Vec::new();
    while let Some(line) = tokio::time::timeout(Duration::from_secs(5), session.recv())
        .await
        .expect("session did not close")
    {
        lines.push(String::from_utf8(line.content).unwrap());
    }
    assert_eq!(lines, vec!["a", "b"]);
    assert!(session.error().await.is_none());
}

#[tokio::test]
async fn streams_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = Arc::new(FjallEngine::open(dir.path()).unwrap());
        let store = LogStore::new(engine, quick_config()).unwrap();
        store.create("build-1").await.unwrap();
        store.write("build-1", &[Line::from("kept")]).await.unwrap();
    }

    let engine = Arc::new(FjallEngine::open(dir.path()).unwrap());
    let store = LogStore::new(engine, quick_config()).unwrap();
    store.exists("build-1").await.unwrap();

    let mut out = Vec::new();
    store.copy_to("build-1", &mut out).await.unwrap();
    assert_eq!(out, b"kept\n");
}
