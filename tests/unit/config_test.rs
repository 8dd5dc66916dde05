//! Tests for configuration validation

use std::collections::HashMap;
use std::path::PathBuf;

use drop_idler::config::{IdleConfig, IdleMode};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = IdleConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.availability.poll_interval_secs, 5);
    assert!(!cfg.start_active);
}

#[test]
fn test_zero_max_concurrent_is_invalid() {
    let cfg = IdleConfig {
        max_concurrent: 0,
        ..IdleConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_intervals_are_invalid() {
    let mut cfg = IdleConfig::default();
    cfg.reap_interval_secs = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = IdleConfig::default();
    cfg.availability.poll_interval_secs = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_mode_resolves_cap() {
    let mut cfg = IdleConfig {
        max_concurrent: 4,
        ..IdleConfig::default()
    };
    cfg.mode = IdleMode::OneByOne;
    assert_eq!(cfg.effective_max_concurrent(), 1);
    cfg.mode = IdleMode::Parallel;
    assert_eq!(cfg.effective_max_concurrent(), 4);
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "mode": "one_by_one",
        "max_concurrent": 8,
        "start_active": true,
        "launcher": { "program": "/usr/bin/idle", "args": ["--app", "{id}"] },
        "availability": { "ignore_client": true },
        "state_path": "/tmp/idle.json"
    }"#;

    let cfg = IdleConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.mode, IdleMode::OneByOne);
    assert_eq!(cfg.max_concurrent, 8);
    assert!(cfg.start_active);
    assert_eq!(cfg.launcher.args, vec!["--app", "{id}"]);
    assert!(cfg.availability.ignore_client);
    assert_eq!(cfg.availability.poll_interval_secs, 5);
    assert_eq!(cfg.state_path, Some(PathBuf::from("/tmp/idle.json")));
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(IdleConfig::from_json_str(r#"{ "max_concurrent": 0 }"#).is_err());
    assert!(IdleConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_load_reports_missing_file() {
    let err = IdleConfig::load("/nonexistent/drop_idler/config.json").unwrap_err();
    assert!(format!("{err:#}").contains("reading config"));
}

#[test]
fn test_config_load_from_file() {
    let dir = std::env::temp_dir().join(format!("drop_idler_cfg_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{ "max_concurrent": 3 }"#).unwrap();

    let cfg = IdleConfig::load(&path).unwrap();
    assert_eq!(cfg.max_concurrent, 3);
}

#[test]
fn test_config_from_lookup() {
    let cfg = IdleConfig::from_lookup(lookup(&[
        ("DROP_IDLER_MODE", "parallel"),
        ("DROP_IDLER_MAX_CONCURRENT", "6"),
        ("DROP_IDLER_START_ACTIVE", "yes"),
        ("DROP_IDLER_LAUNCHER", "idle-bin"),
        ("DROP_IDLER_LAUNCHER_ARGS", "--app {id} --quiet"),
        ("DROP_IDLER_PROBE", "pgrep steam"),
        ("DROP_IDLER_POLL_SECS", "10"),
        ("DROP_IDLER_STATE_PATH", "state.json"),
    ]))
    .unwrap();

    assert_eq!(cfg.effective_max_concurrent(), 6);
    assert!(cfg.start_active);
    assert_eq!(cfg.launcher.program, PathBuf::from("idle-bin"));
    assert_eq!(cfg.launcher.args, vec!["--app", "{id}", "--quiet"]);
    assert_eq!(cfg.availability.probe_program, Some(PathBuf::from("pgrep")));
    assert_eq!(cfg.availability.probe_args, vec!["steam"]);
    assert_eq!(cfg.availability.poll_interval_secs, 10);
    assert_eq!(cfg.state_path, Some(PathBuf::from("state.json")));
}

#[test]
fn test_config_from_lookup_rejects_bad_values() {
    assert!(IdleConfig::from_lookup(lookup(&[("DROP_IDLER_MODE", "turbo")])).is_err());
    assert!(IdleConfig::from_lookup(lookup(&[("DROP_IDLER_MAX_CONCURRENT", "many")])).is_err());
    assert!(IdleConfig::from_lookup(lookup(&[("DROP_IDLER_MAX_CONCURRENT", "0")])).is_err());
    assert!(IdleConfig::from_lookup(lookup(&[("DROP_IDLER_IGNORE_CLIENT", "maybe")])).is_err());
}
