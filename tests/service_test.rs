//! Tests for the serialized idle service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use drop_idler::core::{
    AvailabilityProbe, Catalog, DropOutcome, IdleManager, Item, ItemId, QueuePosition, Scheduler,
    SchedulerError, StartOutcome,
};
use drop_idler::infra::{AlwaysAvailable, InMemoryLauncher, ManualAvailability};
use drop_idler::runtime::{IdleHandle, IdleService, IdleSnapshot, TokioSpawner};

const TICK: Duration = Duration::from_millis(10);

/// Availability check that never answers.
struct HangingProbe;

#[async_trait]
impl AvailabilityProbe for HangingProbe {
    async fn is_available(&self) -> bool {
        std::future::pending().await
    }
}

fn id(raw: &str) -> ItemId {
    ItemId::from(raw)
}

fn manager(ids: &[&str], cap: usize, launcher: &InMemoryLauncher) -> IdleManager {
    let scheduler = Scheduler::new(cap, Arc::new(launcher.clone()))
        .unwrap()
        .with_active(true);
    let mut catalog = Catalog::new();
    for raw in ids {
        catalog.insert(Item::new(*raw, format!("Game {raw}"), 3));
    }
    IdleManager::new(scheduler, catalog)
}

fn spawn(manager: IdleManager, probe: Arc<dyn AvailabilityProbe>) -> IdleHandle {
    IdleService::new(manager, probe)
        .with_intervals(TICK, TICK)
        .spawn(&TokioSpawner::current())
}

async fn wait_for(handle: &IdleHandle, predicate: impl Fn(&IdleSnapshot) -> bool) -> IdleSnapshot {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = handle.snapshot().await.unwrap();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(TICK).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

#[tokio::test]
async fn test_commands_are_applied_in_order() {
    let launcher = InMemoryLauncher::new();
    let handle = spawn(manager(&["a", "b", "c"], 2, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;

    let inserted = handle
        .enqueue_all(vec![id("a"), id("b"), id("c")], QueuePosition::Back)
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.running, vec![id("a"), id("b")]);
    assert_eq!(snapshot.queue, vec![id("a"), id("b"), id("c")]);

    assert_eq!(
        handle.record_drops(id("a"), 3).await.unwrap(),
        DropOutcome::Depleted
    );
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.running, vec![id("b"), id("c")]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_availability_probe_drives_pause_and_resume() {
    let launcher = InMemoryLauncher::new();
    let probe = ManualAvailability::new(false);
    let handle = spawn(manager(&["a", "b"], 2, &launcher), Arc::new(probe.clone()));

    handle.enqueue_back(id("a")).await.unwrap();
    handle.enqueue_back(id("b")).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().running_count, 0);
    assert_eq!(handle.start_item(id("a")).await.unwrap(), StartOutcome::Unavailable);

    probe.set(true);
    wait_for(&handle, |s| s.running_count == 2).await;

    probe.set(false);
    let snapshot = wait_for(&handle, |s| !s.available).await;
    assert_eq!(snapshot.running_count, 0);
    assert_eq!(snapshot.queue, vec![id("a"), id("b")]);
    assert!(launcher.live_items().is_empty());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reap_detaches_exited_workers() {
    let launcher = InMemoryLauncher::new();
    let handle = spawn(manager(&["a"], 1, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;
    handle.enqueue_back(id("a")).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().running_count, 1);

    assert!(launcher.simulate_exit(&id("a")));

    let snapshot = wait_for(&handle, |s| s.running_count == 0).await;
    assert_eq!(snapshot.queue, vec![id("a")]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_workers_and_closes() {
    let launcher = InMemoryLauncher::new();
    let handle = spawn(manager(&["a", "b"], 2, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;
    handle
        .enqueue_all(vec![id("a"), id("b")], QueuePosition::Back)
        .await
        .unwrap();
    assert_eq!(launcher.live_items().len(), 2);

    handle.shutdown().await.unwrap();

    assert!(launcher.live_items().is_empty());
    assert!(matches!(
        handle.snapshot().await,
        Err(SchedulerError::ServiceClosed)
    ));
}

#[tokio::test]
async fn test_dropping_every_handle_stops_workers() {
    let launcher = InMemoryLauncher::new();
    let handle = spawn(manager(&["a"], 1, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;
    handle.enqueue_back(id("a")).await.unwrap();
    assert_eq!(launcher.live_items().len(), 1);

    drop(handle);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !launcher.live_items().is_empty() {
            tokio::time::sleep(TICK).await;
        }
    })
    .await
    .expect("workers still running after handles dropped");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_handles_are_serialized() {
    let launcher = InMemoryLauncher::new();
    let names: Vec<String> = (0..16).map(|n| format!("item-{n}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let handle = spawn(manager(&refs, 3, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;

    let mut tasks = Vec::new();
    for name in names.clone() {
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            handle.enqueue_back(ItemId::from(name)).await.unwrap()
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap());
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.queue.len(), 16);
    assert_eq!(snapshot.running_count, 3);
    assert_eq!(launcher.launches().len(), 3);

    assert!(handle.set_max_concurrent(0).await.is_err());
    handle.set_max_concurrent(5).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().running_count, 5);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_catalog_commands_through_handle() {
    let launcher = InMemoryLauncher::new();
    let handle = spawn(manager(&["a"], 1, &launcher), Arc::new(AlwaysAvailable));
    wait_for(&handle, |s| s.available).await;

    assert!(handle.upsert_item(id("b"), "Game b", 2).await.unwrap());
    assert!(handle.enqueue_front(id("b")).await.unwrap());
    assert!(handle.enqueue_back(id("a")).await.unwrap());
    assert!(handle.demote(id("b")).await.unwrap());
    assert!(!handle.promote(id("a")).await.unwrap());
    assert!(handle.set_blacklisted(id("b"), true).await.unwrap());
    assert!(matches!(
        handle.set_blacklisted(id("zz"), true).await,
        Err(SchedulerError::UnknownItem(_))
    ));
    assert!(handle.stop_item(id("a")).await.unwrap());
    assert!(handle.remove_item(id("b")).await.unwrap());
    assert!(!handle.dequeue(id("a")).await.unwrap());
    handle.set_active(false).await.unwrap();
    handle.set_availability(true).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.items.len(), 1);
    assert!(!snapshot.enabled);

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_closed() {
            tokio::time::sleep(TICK).await;
        }
    })
    .await
    .expect("service did not stop");
}

#[tokio::test]
async fn test_hanging_probe_reads_as_unavailable() {
    let launcher = InMemoryLauncher::new();
    let mut idle = manager(&["a", "b"], 1, &launcher);
    idle.on_availability_changed(true);
    idle.enqueue_back(&id("a"));
    assert_eq!(launcher.live_items(), vec![id("a")]);

    let handle = spawn(idle, Arc::new(HangingProbe));

    let snapshot = wait_for(&handle, |s| !s.available).await;
    assert_eq!(snapshot.running_count, 0);
    assert!(launcher.live_items().is_empty());

    let reply = tokio::time::timeout(Duration::from_secs(2), handle.enqueue_back(id("b")))
        .await
        .expect("service stalled behind the availability check");
    assert!(reply.unwrap());
    assert_eq!(handle.snapshot().await.unwrap().queue, vec![id("a"), id("b")]);

    handle.shutdown().await.unwrap();
}
