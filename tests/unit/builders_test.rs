//! Tests for builder modules

use std::sync::Arc;

use drop_idler::builders::{build_probe, ManagerBuilder};
use drop_idler::config::{IdleConfig, IdleMode};
use drop_idler::core::{Catalog, InMemoryObserver, Item, ItemId, PersistedState, SchedulerError};
use drop_idler::infra::{InMemoryLauncher, InMemoryStateStore};

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(Item::new("440", "Team Fortress 2", 2));
    catalog.insert(Item::new("570", "Dota 2", 2));
    catalog
}

#[test]
fn test_builder_resolves_mode_and_flags() {
    let config = IdleConfig {
        mode: IdleMode::OneByOne,
        max_concurrent: 5,
        start_active: true,
        ..IdleConfig::default()
    };

    let manager = ManagerBuilder::new(config)
        .catalog(catalog())
        .launcher(Arc::new(InMemoryLauncher::new()))
        .build()
        .unwrap();

    assert_eq!(manager.max_concurrent(), 1);
    assert!(manager.is_enabled());
    assert!(!manager.is_available());
    assert_eq!(manager.catalog().len(), 2);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let config = IdleConfig {
        max_concurrent: 0,
        ..IdleConfig::default()
    };

    let err = ManagerBuilder::new(config).build().unwrap_err();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[test]
fn test_builder_ignore_client_starts_available() {
    let mut config = IdleConfig::default();
    config.availability.ignore_client = true;
    config.start_active = true;
    let launcher = InMemoryLauncher::new();

    let mut manager = ManagerBuilder::new(config)
        .catalog(catalog())
        .launcher(Arc::new(launcher.clone()))
        .build()
        .unwrap();
    manager.enqueue_back(&ItemId::from("440"));

    assert!(manager.is_available());
    assert_eq!(launcher.launches(), vec![ItemId::from("440")]);
}

#[test]
fn test_builder_wires_store_and_observer() {
    let store = InMemoryStateStore::with_state(PersistedState {
        queue: vec![ItemId::from("570"), ItemId::from("440")],
        blacklist: Vec::new(),
        max_concurrent: Some(2),
    });
    let observer = InMemoryObserver::shared(32);

    let mut manager = ManagerBuilder::new(IdleConfig::default())
        .catalog(catalog())
        .launcher(Arc::new(InMemoryLauncher::new()))
        .store(Box::new(store))
        .observer(Arc::clone(&observer))
        .build()
        .unwrap();
    let queued = manager.restore().unwrap();

    assert_eq!(queued, 2);
    assert_eq!(manager.queue(), [ItemId::from("570"), ItemId::from("440")]);
    assert_eq!(manager.max_concurrent(), 2);
    assert!(!observer.lock().events().is_empty());
}

#[tokio::test]
async fn test_build_probe_honours_ignore_client() {
    let mut config = IdleConfig::default();
    config.availability.ignore_client = true;
    config.availability.probe_program = Some("/nonexistent/probe".into());

    assert!(build_probe(&config).is_available().await);

    config.availability.ignore_client = false;
    assert!(!build_probe(&config).is_available().await);
}
