//! Tests for error types

use drop_idler::core::{ItemId, SchedulerError};

#[test]
fn test_invalid_concurrency_error() {
    let err = SchedulerError::InvalidConcurrency(0);
    assert_eq!(format!("{}", err), "max concurrent must be at least 1, got 0");
}

#[test]
fn test_unknown_item_error() {
    let err = SchedulerError::UnknownItem(ItemId::from("440"));
    assert_eq!(format!("{}", err), "unknown item: 440");
}

#[test]
fn test_launch_error() {
    let err = SchedulerError::Launch("steam-idle: not found".to_string());
    assert_eq!(format!("{}", err), "launch failed: steam-idle: not found");
}

#[test]
fn test_persistence_error() {
    let err = SchedulerError::Persistence("disk full".to_string());
    assert_eq!(format!("{}", err), "persistence error: disk full");
}

#[test]
fn test_service_closed_error() {
    assert_eq!(
        format!("{}", SchedulerError::ServiceClosed),
        "idle service is not running"
    );
}

#[test]
fn test_error_converts_into_anyhow() {
    let result: drop_idler::core::AppResult<()> =
        Err(SchedulerError::Config("bad".to_string()).into());
    let err = result.unwrap_err();
    assert!(err.downcast_ref::<SchedulerError>().is_some());
}
