mod common;

use common::{config, memory_service, report_times, FlakyStore, SlowStore};
use std::sync::Arc;
use std::time::Duration;
use typeahead_indexer::TypeaheadService;

#[tokio::test(start_paused = true)]
async fn timer_consolidates_once_threshold_is_reached() {
    let (_store, service) = memory_service(config(5, 1, 2));
    let worker = service.start_worker();
    let mut updates = worker.subscribe_updates();

    report_times(&service, "dog", 3).await;
    report_times(&service, "door", 1).await;

    let update = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("pass within a few ticks")
        .unwrap();
    assert!(update.success);
    assert_eq!(update.reason, "tick");
    assert_eq!(update.stats.unwrap().words_drained, 2);

    assert_eq!(service.lookup("do").await.unwrap(), vec!["dog", "door"]);
    let health = worker.health_snapshot();
    assert_eq!(health.passes, 1);
    assert_eq!(health.consecutive_failures, 0);
    assert!(health.last_success.is_some());

    worker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn idle_ticks_do_not_emit_updates() {
    let (_store, service) = memory_service(config(5, 1, 10));
    let worker = service.start_worker();
    let mut health = worker.health_stream();

    report_times(&service, "cat", 1).await;
    health.changed().await.unwrap();

    let snapshot = worker.health_snapshot();
    assert!(snapshot.idle_ticks >= 1);
    assert_eq!(snapshot.passes, 0);
    assert_eq!(service.index_snapshot().pending_queries, 1);

    worker.shutdown().await;
}

#[tokio::test]
async fn forced_trigger_bypasses_threshold() {
    let (_store, service) = memory_service(config(5, 1, 100));
    let worker = service.start_worker();
    let mut updates = worker.subscribe_updates();

    report_times(&service, "owl", 1).await;
    worker.trigger("manual", true).await.unwrap();

    let update = updates.recv().await.unwrap();
    assert!(update.success);
    assert_eq!(update.reason, "manual");
    assert_eq!(service.lookup("o").await.unwrap(), vec!["owl"]);
}

#[tokio::test]
async fn failed_pass_is_reported_and_gate_reopens() {
    let store = Arc::new(FlakyStore::default());
    let service = TypeaheadService::new(store.clone(), config(5, 1, 1)).unwrap();
    let worker = service.start_worker();
    let mut updates = worker.subscribe_updates();

    report_times(&service, "eel", 1).await;
    store.set_failing(true);
    worker.trigger("manual", true).await.unwrap();

    let update = updates.recv().await.unwrap();
    assert!(!update.success);
    assert!(update.error.unwrap().contains("Store unreachable"));
    assert_eq!(worker.health_snapshot().consecutive_failures, 1);
    assert!(!service.is_consolidating());

    store.set_failing(false);
    report_times(&service, "eel", 1).await;
    worker.trigger("retry", true).await.unwrap();
    let update = updates.recv().await.unwrap();
    assert!(update.success);

    let health = worker.health_snapshot();
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(health.failures, 1);
    assert_eq!(health.passes, 1);
}

#[tokio::test]
async fn shutdown_waits_for_running_pass() {
    let store = Arc::new(SlowStore::new(Duration::from_millis(150)));
    let service = TypeaheadService::new(store, config(5, 1, 100)).unwrap();
    let worker = service.start_worker();

    report_times(&service, "owl", 1).await;
    worker.trigger("manual", true).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !service.is_consolidating() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("pass started");

    worker.shutdown().await;

    assert!(!service.is_consolidating());
    assert_eq!(service.lookup("o").await.unwrap(), vec!["owl"]);
    assert_eq!(service.lookup("owl").await.unwrap(), vec!["owl"]);
    assert!(worker.trigger("late", true).await.is_err());
}
