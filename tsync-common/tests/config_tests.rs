//! Root folder resolution and service config loading

use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;
use tsync_common::config::{resolve_root_folder, SyncConfig, DEFAULT_PORT, ROOT_FOLDER_ENV};

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    std::env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let root = resolve_root_folder(Some("/tmp/from-cli"), ROOT_FOLDER_ENV);
    std::env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/tmp/from-cli"));
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    std::env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    std::env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/tmp/from-env"));
}

#[test]
#[serial]
fn test_blank_environment_falls_through() {
    std::env::set_var(ROOT_FOLDER_ENV, "  ");
    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    std::env::remove_var(ROOT_FOLDER_ENV);

    assert_ne!(root, PathBuf::from("  "));
}

#[test]
fn test_missing_service_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::load(dir.path()).unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.database_path(dir.path()), dir.path().join("tsync.db"));
}

#[test]
fn test_service_config_loaded_from_root_folder() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("tsync.toml"),
        "port = 6001\nsite_url = \"https://scores.example.net\"\n",
    )
    .unwrap();

    let config = SyncConfig::load(dir.path()).unwrap();
    assert_eq!(config.port, 6001);
    assert_eq!(config.site_base(), "https://scores.example.net");
}

#[test]
fn test_invalid_service_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("tsync.toml"), "port = \"not a number\"\n").unwrap();

    assert!(SyncConfig::load(dir.path()).is_err());
}
