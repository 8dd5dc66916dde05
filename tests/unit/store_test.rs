//! Tests for state store backends

use drop_idler::core::{ItemId, PersistedState, StateStore};
use drop_idler::infra::{InMemoryStateStore, JsonFileStateStore};

fn state() -> PersistedState {
    PersistedState {
        queue: vec![ItemId::from("570"), ItemId::from("440")],
        blacklist: vec![ItemId::from("730")],
        max_concurrent: Some(2),
    }
}

#[test]
fn test_in_memory_store_shares_state_between_clones() {
    let store = InMemoryStateStore::new();
    let mut writer = store.clone();

    writer.save(&state()).unwrap();

    assert_eq!(store.saved(), Some(state()));
    assert_eq!(store.save_count(), 1);
}

#[test]
fn test_in_memory_store_preloaded() {
    let mut store = InMemoryStateStore::with_state(state());
    assert_eq!(store.load().unwrap(), Some(state()));
}

#[test]
fn test_json_store_survives_reopen() {
    let path = std::env::temp_dir()
        .join(format!("drop_idler_{}", uuid::Uuid::new_v4()))
        .join("nested")
        .join("idle.json");
    let mut store = JsonFileStateStore::new(&path).unwrap();
    assert_eq!(store.load().unwrap(), None);

    store.save(&state()).unwrap();
    let mut reopened = JsonFileStateStore::new(&path).unwrap();

    assert_eq!(reopened.load().unwrap(), Some(state()));
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn test_persisted_state_tolerates_missing_fields() {
    let state: PersistedState = serde_json::from_str(r#"{ "queue": ["1", "2"] }"#).unwrap();
    assert_eq!(state.queue, vec![ItemId::from("1"), ItemId::from("2")]);
    assert!(state.blacklist.is_empty());
    assert_eq!(state.max_concurrent, None);
}
