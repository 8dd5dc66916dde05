//! Tests for runtime adapters and snapshots

use std::sync::Arc;

use drop_idler::core::{Catalog, IdleManager, Item, ItemId, ItemState, Scheduler};
use drop_idler::infra::InMemoryLauncher;
use drop_idler::runtime::{health, IdleSnapshot, Spawn, TokioSpawner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(async move {
        tx.send(123).unwrap();
    });

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

fn manager() -> IdleManager {
    let scheduler = Scheduler::new(1, Arc::new(InMemoryLauncher::new()))
        .unwrap()
        .with_active(true)
        .with_available(true);
    let mut catalog = Catalog::new();
    catalog.insert(Item::new("a", "Alpha", 4));
    catalog.insert(Item::new("b", "Beta", 6));
    catalog.insert(Item::new("c", "Gamma", 0));
    IdleManager::new(scheduler, catalog)
}

#[test]
fn test_snapshot_reflects_manager() {
    let mut manager = manager();
    manager.enqueue_back(&ItemId::from("a"));
    manager.enqueue_back(&ItemId::from("b"));

    let snapshot = manager.snapshot();

    assert_eq!(snapshot.queue, vec![ItemId::from("a"), ItemId::from("b")]);
    assert_eq!(snapshot.running, vec![ItemId::from("a")]);
    assert_eq!(snapshot.running_count, 1);
    assert!(snapshot.is_active());
    assert_eq!(snapshot.totals.items, 3);
    assert_eq!(snapshot.totals.remaining_units, 10);

    let states: Vec<ItemState> = snapshot.items.iter().map(|i| i.state).collect();
    assert_eq!(
        states,
        vec![ItemState::QueuedRunning, ItemState::QueuedWaiting, ItemState::Depleted]
    );
    assert_eq!(snapshot.items[1].queue_position, Some(1));
    assert!(snapshot.items[0].pid.is_some());
}

#[test]
fn test_snapshot_serializes() {
    let snapshot = manager().snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: IdleSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn test_health() {
    let mut manager = manager();
    manager.enqueue_back(&ItemId::from("a"));
    let report = health(&manager.snapshot());
    assert!(report.ok);
    assert_eq!(report.running, 1);

    manager.on_availability_changed(false);
    assert!(health(&manager.snapshot()).ok);
}
