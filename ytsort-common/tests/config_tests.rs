//! Configuration loading and root folder resolution
//!
//! Tests that manipulate YTSORT_ROOT_FOLDER or YTSORT_ACCESS_TOKEN are marked
//! #[serial] so they never race on the process environment.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use ytsort_common::config::{
    load_toml_config, parse_toml_config, resolve_root_folder, ApiConfig, TomlConfig,
    ACCESS_TOKEN_ENV, ROOT_FOLDER_ENV,
};

#[test]
#[serial]
fn test_cli_argument_wins_over_everything() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ytsort-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ytsort-toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/tmp/ytsort-cli")), &config);
    assert_eq!(root, PathBuf::from("/tmp/ytsort-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/ytsort-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ytsort-toml")),
        ..Default::default()
    };

    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/tmp/ytsort-env")
    );

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_folder_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/ytsort-toml")),
        ..Default::default()
    };

    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/tmp/ytsort-toml")
    );
}

#[test]
#[serial]
fn test_compiled_default_is_non_empty() {
    env::remove_var(ROOT_FOLDER_ENV);
    let root = resolve_root_folder(None, &TomlConfig::default());
    assert!(!root.as_os_str().is_empty());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = parse_toml_config(
        r#"
        [organizer]
        max_length = 12

        [organizer.min_duration]
        minutes = 2
        "#,
    )
    .unwrap();

    assert_eq!(config.organizer.max_length, 12);
    assert_eq!(config.organizer.min_duration.as_secs(), 120);
    assert_eq!(config.organizer.max_iterations, 5);
    assert_eq!(config.organizer.history_per_collection, 100);
    assert_eq!(config.api.page_size, 50);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = parse_toml_config("organizer = [").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_explicit_missing_file_is_error() {
    let result = load_toml_config(Some(Path::new("/nonexistent/ytsort/config.toml")));
    assert!(result.is_err());
}

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/ytsort"

        [api]
        detail_workers = 8
        "#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/ytsort")));
    assert_eq!(config.api.detail_workers, 8);
}

#[test]
#[serial]
fn test_access_token_env_over_toml() {
    env::set_var(ACCESS_TOKEN_ENV, "env-token");
    let api = ApiConfig {
        access_token: Some("toml-token".to_string()),
        ..Default::default()
    };
    assert_eq!(api.resolve_access_token().unwrap(), "env-token");
    env::remove_var(ACCESS_TOKEN_ENV);

    assert_eq!(api.resolve_access_token().unwrap(), "toml-token");
}

#[test]
#[serial]
fn test_access_token_missing_is_error() {
    env::remove_var(ACCESS_TOKEN_ENV);
    let api = ApiConfig {
        access_token: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(api.resolve_access_token().is_err());
}
