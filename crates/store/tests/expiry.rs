//! TTL set-once and background sweep tests

use std::sync::Arc;
use std::time::Duration;
use streamline_store::{expiry, Line, LogEngine, LogStore, MemoryEngine, StoreConfig, TtlOutcome, TtlState};

fn new_store(config: StoreConfig) -> (Arc<MemoryEngine>, LogStore<MemoryEngine>) {
    let engine = Arc::new(MemoryEngine::new());
    let store = LogStore::new(engine.clone(), config).unwrap();
    (engine, store)
}

#[tokio::test]
async fn set_once_assigns_then_reports_already_set() {
    let engine = MemoryEngine::new();
    engine.append("k", b"x".to_vec(), 100).await.unwrap();

    let first = expiry::set_once(&engine, "k", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(first, TtlOutcome::Assigned);

    let remaining_before = match engine.ttl("k").await.unwrap() {
        TtlState::Set(r) => r,
        other => panic!("expected Set, got {other:?}"),
    };

    // Second attempt with a much longer duration must not extend anything.
    let second = expiry::set_once(&engine, "k", Duration::from_secs(3600))
        .await
        .unwrap();
    assert_eq!(second, TtlOutcome::AlreadySet);

    let remaining_after = match engine.ttl("k").await.unwrap() {
        TtlState::Set(r) => r,
        other => panic!("expected Set, got {other:?}"),
    };
    assert!(remaining_after <= remaining_before);
    assert!(remaining_after > Duration::from_secs(50), "countdown reset");
}

#[tokio::test]
async fn set_once_on_missing_key_is_an_error() {
    let engine = MemoryEngine::new();
    let result = expiry::set_once(&engine, "missing", Duration::from_secs(60)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn create_assigns_the_default_ttl() {
    let (engine, store) = new_store(StoreConfig::default());
    store.create("build-1").await.unwrap();
    assert!(matches!(
        engine.ttl("build-1").await.unwrap(),
        TtlState::Set(_)
    ));
}

#[tokio::test]
async fn write_does_not_extend_an_existing_ttl() {
    let (engine, store) = new_store(StoreConfig::default().with_default_ttl(Duration::from_secs(10)));
    store.create("build-1").await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    store.write("build-1", &[Line::from("l1")]).await.unwrap();

    match engine.ttl("build-1").await.unwrap() {
        // Still counting down from create; a write must not reset it to 10s.
        TtlState::Set(remaining) => assert!(remaining < Duration::from_secs(10)),
        other => panic!("expected Set, got {other:?}"),
    }
}

#[tokio::test]
async fn sweep_heals_keys_missing_a_ttl() {
    let (engine, _store) = new_store(
        StoreConfig::default()
            .with_default_ttl(Duration::from_millis(100))
            .with_scan_page_size(2),
    );

    // Created behind the store's back, so no TTL is attached.
    for i in 0..5 {
        engine
            .append(&format!("naked-{i}"), b"x".to_vec(), 100)
            .await
            .unwrap();
    }

    // Within one sweep cycle every key must have left the Unset state:
    // either a TTL was attached, or it already expired and was reaped.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let mut pending = 0;
        for i in 0..5 {
            if engine.ttl(&format!("naked-{i}")).await.unwrap() == TtlState::Unset {
                pending += 1;
            }
        }
        if pending == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "{pending} keys still immortal after a full sweep cycle"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn shutdown_stops_the_sweep() {
    let (engine, mut store) = new_store(
        StoreConfig::default().with_default_ttl(Duration::from_millis(50)),
    );
    store.shutdown();

    engine.append("naked", b"x".to_vec(), 100).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(
        engine.ttl("naked").await.unwrap(),
        TtlState::Unset,
        "sweep still running after shutdown"
    );
}

#[tokio::test]
async fn sweep_and_foreground_set_race_harmlessly() {
    let (engine, store) = new_store(
        StoreConfig::default().with_default_ttl(Duration::from_secs(30)),
    );
    store.create("build-1").await.unwrap();

    // Foreground re-attempt after create: always the losing side.
    let outcome = expiry::set_once(engine.as_ref(), "build-1", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(outcome, TtlOutcome::AlreadySet);
}
