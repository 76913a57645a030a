//! Integration tests for layered Settings loading.
//!
//! Every test uses its own environment prefix so parallel tests cannot see
//! each other's variables.

use std::env;
use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use nestedset::config::{Settings, SettingsError};

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn given_global_and_explicit_file_when_loading_then_explicit_wins() {
    let dir = TempDir::new().unwrap();
    let global = write(
        &dir,
        "global.toml",
        r#"
table = "global_nodes"
lock_timeout_ms = 100
"#,
    );
    let local = write(&dir, "local.toml", "table = \"local_nodes\"\n");

    let settings = Settings::load_layers(Some(&global), Some(&local), "NESTEDSET_TEST_LAYERS").unwrap();

    assert_eq!(settings.table, "local_nodes");
    assert_eq!(settings.lock_timeout_ms, 100);
    assert_eq!(settings.database, Settings::default().database);
}

#[test]
fn given_missing_global_file_when_loading_then_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load_layers(
        Some(&dir.path().join("absent.toml")),
        None,
        "NESTEDSET_TEST_ABSENT",
    )
    .unwrap();

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_missing_explicit_file_when_loading_then_read_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load_layers(None, Some(&dir.path().join("absent.toml")), "NESTEDSET_TEST_MISSING");

    assert!(matches!(result, Err(SettingsError::Read { .. })));
}

#[test]
fn given_malformed_file_when_loading_then_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.toml", "lock_timeout_ms = \"soon\"\n");

    let result = Settings::load_layers(None, Some(&path), "NESTEDSET_TEST_MALFORMED");

    assert!(matches!(result, Err(SettingsError::Parse { .. })));
}

#[test]
fn given_env_vars_when_loading_then_they_override_files() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.toml",
        r#"
database = "/tmp/from-file.db"
default_max_level = 1
"#,
    );
    env::set_var("NESTEDSET_TEST_ENV_DATABASE", "/tmp/from-env.db");
    env::set_var("NESTEDSET_TEST_ENV_LOCK_TIMEOUT_MS", "250");

    let settings = Settings::load_layers(None, Some(&path), "NESTEDSET_TEST_ENV").unwrap();

    env::remove_var("NESTEDSET_TEST_ENV_DATABASE");
    env::remove_var("NESTEDSET_TEST_ENV_LOCK_TIMEOUT_MS");
    assert_eq!(settings.database, PathBuf::from("/tmp/from-env.db"));
    assert_eq!(settings.lock_timeout_ms, 250);
    assert_eq!(settings.default_max_level, Some(1));
}

#[test]
fn given_unsafe_table_name_when_loading_then_invalid() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "table = \"nodes; drop\"\n");

    let result = Settings::load_layers(None, Some(&path), "NESTEDSET_TEST_TABLE");

    assert!(matches!(result, Err(SettingsError::Invalid { key: "table", .. })));
}

#[test]
fn given_settings_when_serialized_then_reloadable() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        table: "nodes".into(),
        default_max_level: Some(2),
        ..Settings::default()
    };
    let path = write(&dir, "roundtrip.toml", &settings.to_toml().unwrap());

    let loaded = Settings::load_layers(None, Some(&path), "NESTEDSET_TEST_ROUNDTRIP").unwrap();

    assert_eq!(loaded, settings);
}
