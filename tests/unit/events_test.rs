//! Tests for change notifications

use std::sync::Arc;

use drop_idler::core::{
    build_event, IdleEventKind, IdleObserver, InMemoryObserver, ItemId, TracingObserver,
};

#[test]
fn test_in_memory_observer() {
    let mut observer = InMemoryObserver::new(10);
    let event = build_event(IdleEventKind::WorkerStarted {
        item: ItemId::from("440"),
    });

    observer.notify(&event);

    let events = observer.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, event.event_id);
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_observer_overflow() {
    let mut observer = InMemoryObserver::new(2);
    for available in [true, false, true] {
        observer.notify(&build_event(IdleEventKind::AvailabilityChanged { available }));
    }

    assert_eq!(
        observer.kinds(),
        vec![
            IdleEventKind::AvailabilityChanged { available: false },
            IdleEventKind::AvailabilityChanged { available: true },
        ]
    );
    observer.clear();
    assert!(observer.events().is_empty());
}

#[test]
fn test_event_ids_are_unique() {
    let a = build_event(IdleEventKind::ActivityChanged { active: true });
    let b = build_event(IdleEventKind::ActivityChanged { active: true });
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn test_tracing_observer_accepts_every_kind() {
    let mut observer = TracingObserver;
    let item = ItemId::from("1");
    for kind in [
        IdleEventKind::QueueChanged { queue: vec![item.clone()] },
        IdleEventKind::LaunchFailed { item: item.clone(), reason: "boom".into() },
        IdleEventKind::WorkerExited { item: item.clone() },
        IdleEventKind::BlacklistChanged { item, blacklisted: true },
    ] {
        observer.notify(&build_event(kind));
    }
}

#[test]
fn test_shared_observer_handle() {
    let shared = InMemoryObserver::shared(4);
    let mut registered = Arc::clone(&shared);

    registered.notify(&build_event(IdleEventKind::CapacityChanged { max_concurrent: 2 }));

    assert_eq!(
        shared.lock().kinds(),
        vec![IdleEventKind::CapacityChanged { max_concurrent: 2 }]
    );
}
