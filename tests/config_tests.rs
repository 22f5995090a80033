//! Integration tests for configuration management

use plan_tracker::config::{Config, ConfigOverrides};
use plan_tracker::core::storage::BackendKind;
use plan_tracker::core::sync::BackendConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_from_defaults() {
    let config = Config::from_defaults();

    assert!(
        !config.logging.level.is_empty(),
        "Default log level should not be empty"
    );
    assert!(
        !config.storage.local_dir.is_empty(),
        "Default local_dir should not be empty"
    );
    assert_eq!(config.remote.table, "user_state");
    assert_eq!(config.catalog.plan_id, "biomedica-2022");
    assert!(!config.storage.offline);
}

#[test]
fn test_config_from_toml_basic() {
    let toml_str = r#"
[logging]
level = "info"
file = "/tmp/test.log"
verbose = true

[storage]
offline = true
local_dir = "/var/lib/plantracker"

[remote]
url = "https://example.supabase.co"
anon_key = "anon"
table = "states"

[catalog]
plan_id = "informatica-2023"
path = "/plans/informatica.toml"
"#;

    let config = Config::from_toml(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file, "/tmp/test.log");
    assert!(config.logging.verbose);
    assert!(config.storage.offline);
    assert_eq!(config.storage.local_dir, "/var/lib/plantracker");
    assert_eq!(config.remote.url, "https://example.supabase.co");
    assert_eq!(config.remote.anon_key, "anon");
    assert_eq!(config.remote.table, "states");
    assert_eq!(config.catalog.plan_id, "informatica-2023");
    assert_eq!(config.catalog.path, "/plans/informatica.toml");
}

#[test]
fn test_config_from_toml_partial() {
    // Missing sections and fields use serde defaults
    let toml_str = r#"
[logging]
level = "error"
"#;

    let config = Config::from_toml(toml_str).expect("Failed to parse partial TOML");

    assert_eq!(config.logging.level, "error");
    assert_eq!(config.logging.file, "");
    assert!(!config.logging.verbose);
    assert!(!config.storage.offline);
    assert_eq!(config.remote.url, "");
    assert_eq!(config.legacy.records_sheet, "");
}

#[test]
fn test_config_variable_expansion() {
    let toml_str = r#"
[logging]
file = "$PLAN_TRACKER/test.log"

[storage]
local_dir = "$PLAN_TRACKER/data"
"#;

    let config = Config::from_toml(toml_str).expect("Failed to parse TOML with variables");

    assert!(config.logging.file.contains("plantracker"));
    assert!(!config.logging.file.contains("$PLAN_TRACKER"));
    assert!(config.storage.local_dir.ends_with("data"));
    assert!(!config.storage.local_dir.contains("$PLAN_TRACKER"));
}

#[test]
fn test_config_get_set() {
    let mut config = Config::from_defaults();

    assert!(config.get("level").is_some());

    config.set("level", "debug").expect("Failed to set level");
    assert_eq!(config.get("level").unwrap(), "debug");

    config.set("offline", "true").expect("Failed to set offline");
    assert_eq!(config.get("offline").unwrap(), "true");
    assert!(config.storage.offline);

    // Dashes and underscores are interchangeable
    config
        .set("remote-url", "https://x.supabase.co")
        .expect("Failed to set remote url");
    assert_eq!(config.get("remote_url").unwrap(), "https://x.supabase.co");

    assert!(config.get("unknown_key").is_none());
    assert!(config.set("unknown_key", "value").is_err());
    assert!(config.set("verbose", "maybe").is_err());
}

#[test]
fn test_config_unset() {
    let mut config = Config::from_defaults();
    let defaults = Config::from_defaults();

    config.set("records_sheet", "Hoja 2").expect("Failed to set sheet");
    assert_eq!(config.legacy.records_sheet, "Hoja 2");

    config
        .unset("records_sheet", &defaults)
        .expect("Failed to unset sheet");
    assert_eq!(config.legacy.records_sheet, defaults.legacy.records_sheet);
    assert!(config.unset("nope", &defaults).is_err());
}

#[test]
fn test_config_save_and_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_file = temp_dir.path().join("config.toml");

    let mut config = Config::from_defaults();
    config.set("level", "info").expect("Failed to set level");
    config.set("plan_id", "informatica-2023").expect("Failed to set plan");

    let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");
    fs::write(&config_file, toml_str).expect("Failed to write config");

    let content = fs::read_to_string(&config_file).expect("Failed to read config");
    let loaded_config = Config::from_toml(&content).expect("Failed to parse loaded config");

    assert_eq!(loaded_config.logging.level, "info");
    assert_eq!(loaded_config.catalog.plan_id, "informatica-2023");
}

#[test]
fn test_config_overrides_apply() {
    let mut config = Config::from_defaults();

    let overrides = ConfigOverrides {
        level: Some("error".to_string()),
        file: Some("/custom/path.log".to_string()),
        verbose: Some(true),
        offline: Some(true),
        local_dir: Some("/custom/store".to_string()),
        remote_url: Some("https://override.supabase.co".to_string()),
        remote_key: Some("override_key".to_string()),
        catalog_path: Some("/custom/plan.toml".to_string()),
    };

    config.apply_overrides(&overrides);

    assert_eq!(config.logging.level, "error");
    assert_eq!(config.logging.file, "/custom/path.log");
    assert!(config.logging.verbose);
    assert!(config.storage.offline);
    assert_eq!(config.storage.local_dir, "/custom/store");
    assert_eq!(config.remote.url, "https://override.supabase.co");
    assert_eq!(config.remote.anon_key, "override_key");
    assert_eq!(config.catalog.path, "/custom/plan.toml");
}

#[test]
fn test_config_overrides_partial() {
    let mut config = Config::from_defaults();
    let before_dir = config.storage.local_dir.clone();

    let overrides = ConfigOverrides {
        level: Some("debug".to_string()),
        ..ConfigOverrides::default()
    };
    config.apply_overrides(&overrides);

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.storage.local_dir, before_dir);
}

#[test]
fn test_env_overrides_select_remote_backend() {
    let mut config = Config::from_defaults();
    assert_eq!(BackendConfig::select(&config).kind(), BackendKind::Legacy);

    let overrides = ConfigOverrides::from_lookup(|key| match key {
        "PLAN_TRACKER_REMOTE_URL" => Some("https://x.supabase.co".to_string()),
        "PLAN_TRACKER_REMOTE_KEY" => Some("anon".to_string()),
        _ => None,
    });
    config.apply_overrides(&overrides);
    assert_eq!(BackendConfig::select(&config).kind(), BackendKind::Remote);

    let offline = ConfigOverrides::from_lookup(|key| {
        (key == "PLAN_TRACKER_OFFLINE").then(|| "1".to_string())
    });
    config.apply_overrides(&offline);
    assert_eq!(BackendConfig::select(&config).kind(), BackendKind::Local);
}

#[test]
fn test_config_display_format() {
    let mut config = Config::from_defaults();
    config.remote.anon_key = "supersecretkey".to_string();
    let display_str = format!("{config}");

    assert!(display_str.contains("[logging]"));
    assert!(display_str.contains("[storage]"));
    assert!(display_str.contains("[remote]"));
    assert!(display_str.contains("[catalog]"));
    assert!(display_str.contains("level"));
    assert!(display_str.contains("offline"));
    assert!(!display_str.contains("supersecretkey"));
}

#[test]
fn test_merge_defaults_adds_missing_fields() {
    let toml_str = r#"
[logging]
level = "error"

[remote]
table = ""
"#;

    let mut config = Config::from_toml(toml_str).expect("Failed to parse minimal config");
    let defaults = Config::from_defaults();

    assert!(config.merge_defaults(&defaults));
    assert_eq!(config.remote.table, "user_state");
    assert_eq!(config.legacy.user_sheet, defaults.legacy.user_sheet);
    assert_eq!(config.catalog.plan_id, "biomedica-2022");
}

#[test]
fn test_merge_defaults_preserves_existing() {
    let toml_str = r#"
[logging]
level = "error"
file = "/my/custom/path.log"

[catalog]
plan_id = "informatica-2023"
"#;

    let mut config = Config::from_toml(toml_str).expect("Failed to parse config");
    let defaults = Config::from_defaults();

    config.merge_defaults(&defaults);

    assert_eq!(config.logging.level, "error");
    assert_eq!(config.logging.file, "/my/custom/path.log");
    assert_eq!(config.catalog.plan_id, "informatica-2023");
}

#[test]
fn test_get_plantracker_dir() {
    let dir = Config::get_plantracker_dir();

    assert!(dir.to_string_lossy().contains("plantracker"));
    assert_ne!(dir, PathBuf::from("."));
}

#[test]
fn test_get_config_file_path() {
    let path = Config::get_config_file_path();

    let path_str = path.to_string_lossy();
    assert!(path_str.ends_with("config.toml") || path_str.ends_with("dconfig.toml"));
}
