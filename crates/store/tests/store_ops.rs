//! Stream store operation tests over the in-memory engine

use std::sync::Arc;
use std::time::Duration;
use streamline_store::{Line, LogEngine, LogStore, MemoryEngine, StoreConfig, StoreError};

fn quick_config() -> StoreConfig {
    StoreConfig::default()
        .with_poll_interval(Duration::from_millis(20))
        .with_tail_max_duration(Duration::from_millis(300))
}

fn new_store(config: StoreConfig) -> (Arc<MemoryEngine>, LogStore<MemoryEngine>) {
    let engine = Arc::new(MemoryEngine::new());
    let store = LogStore::new(engine.clone(), config).unwrap();
    (engine, store)
}

#[tokio::test]
async fn write_to_missing_key_is_not_found() {
    let (_engine, store) = new_store(quick_config());

    let result = store.write("missing", &[Line::from("l1")]).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));

    // The failed write must not have materialized the key.
    assert!(store.exists("missing").await.is_err());
}

#[tokio::test]
async fn delete_missing_key_is_not_found() {
    let (_engine, store) = new_store(quick_config());
    let result = store.delete("missing-key").await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn create_makes_stream_visible() {
    let (_engine, store) = new_store(quick_config());
    store.create("build-1").await.unwrap();
    store.exists("build-1").await.unwrap();
    store.delete("build-1").await.unwrap();
    assert!(store.exists("build-1").await.is_err());
}

#[tokio::test]
async fn recreate_discards_prior_entries() {
    let (_engine, store) = new_store(quick_config());
    store.create("build-1").await.unwrap();
    store
        .write("build-1", &[Line::from("old1"), Line::from("old2")])
        .await
        .unwrap();

    store.create("build-1").await.unwrap();

    let mut out = Vec::new();
    store.copy_to("build-1", &mut out).await.unwrap();
    assert!(out.is_empty(), "fresh stream still had {out:?}");
}

#[tokio::test]
async fn copy_to_dumps_lines_newline_delimited() {
    let (_engine, store) = new_store(quick_config());
    store.create("build-1").await.unwrap();
    store
        .write(
            "build-1",
            &[Line::from("l1"), Line::from("l2"), Line::from("l3")],
        )
        .await
        .unwrap();

    let mut out = Vec::new();
    store.copy_to("build-1", &mut out).await.unwrap();
    assert_eq!(out, b"l1\nl2\nl3\n");
}

#[tokio::test]
async fn copy_to_missing_key_is_not_found() {
    let (_engine, store) = new_store(quick_config());
    let mut out = Vec::new();
    let result = store.copy_to("missing", &mut out).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
    assert!(out.is_empty());
}

#[tokio::test]
async fn overfull_stream_settles_at_or_above_the_bound() {
    let (engine, store) = new_store(quick_config().with_max_stream_size(10));
    store.create("build-1").await.unwrap();

    let lines: Vec<Line> = (0..80).map(|i| Line::from(format!("line-{i}"))).collect();
    store.write("build-1", &lines).await.unwrap();

    let len = engine.len("build-1").await.unwrap();
    assert!(len >= 10, "trimmed below the bound: {len}");
    assert!(len < 80, "never trimmed: {len}");
}

#[tokio::test]
async fn list_prefix_dedupes_and_caps() {
    let (engine, store) = new_store(
        quick_config()
            .with_max_prefix_keys(5)
            .with_scan_page_size(3),
    );
    for i in 0..12 {
        engine
            .append(&format!("job-{i}"), b"x".to_vec(), 100)
            .await
            .unwrap();
    }
    for i in 0..3 {
        engine
            .append(&format!("other-{i}"), b"x".to_vec(), 100)
            .await
            .unwrap();
    }

    let keys = store.list_prefix("job-").await.unwrap();
    assert_eq!(keys.len(), 5, "cap not applied: {keys:?}");
    assert!(keys.iter().all(|k| k.starts_with("job-")));

    let mut deduped = keys.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), keys.len(), "duplicates in {keys:?}");
}

#[tokio::test]
async fn list_prefix_empty_prefix_yields_nothing() {
    let (engine, store) = new_store(quick_config());
    engine.append("job-1", b"x".to_vec(), 100).await.unwrap();
    assert!(store.list_prefix("").await.unwrap().is_empty());
}

#[tokio::test]
async fn info_reports_sizes_and_ttls() {
    let (engine, store) = new_store(quick_config());
    store.create("build-1").await.unwrap();
    store.write("build-1", &[Line::from("l1")]).await.unwrap();

    // A key created behind the store's back has no TTL yet.
    engine.append("naked", b"x".to_vec(), 100).await.unwrap();

    let info = store.info().await;
    let stats = info.streams.get("build-1").unwrap();
    assert!(stats.size >= 2, "sentinel plus one line expected");
    assert_ne!(stats.ttl, "-1");

    let naked = info.streams.get("naked").unwrap();
    assert_eq!(naked.size, 1);
    assert_eq!(naked.ttl, "-1");
}

#[tokio::test]
async fn ping_reports_engine_liveness() {
    let (_engine, store) = new_store(quick_config());
    store.ping().await.unwrap();
}

#[tokio::test]
async fn zero_poll_interval_aborts_construction() {
    let engine = Arc::new(MemoryEngine::new());
    let result = LogStore::new(
        engine,
        StoreConfig::default().with_poll_interval(Duration::ZERO),
    );
    assert!(matches!(result, Err(StoreError::Config(_))));
}
