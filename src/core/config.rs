//! Configuration module for `plan-tracker`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Default configuration loaded based on build profile.
#[cfg(not(debug_assertions))]
const CONFIG_DEFAULTS: &str = include_str!("../assets/DefaultConfigRelease.toml");

#[cfg(debug_assertions)]
const CONFIG_DEFAULTS: &str = include_str!("../assets/DefaultConfigDebug.toml");

#[cfg(not(debug_assertions))]
const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(debug_assertions)]
const CONFIG_FILE_NAME: &str = "dconfig.toml";

/// Variable expanded to the configuration directory inside string values.
const DIR_VARIABLE: &str = "$PLAN_TRACKER";

/// Environment variable forcing offline mode (`1`, `true`, `yes`, `on`).
pub const ENV_OFFLINE: &str = "PLAN_TRACKER_OFFLINE";
/// Environment variable carrying the remote store URL.
pub const ENV_REMOTE_URL: &str = "PLAN_TRACKER_REMOTE_URL";
/// Environment variable carrying the remote store key.
pub const ENV_REMOTE_KEY: &str = "PLAN_TRACKER_REMOTE_KEY";

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    #[serde(default)]
    pub level: String,
    /// Log file path
    #[serde(default)]
    pub file: String,
    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,
}

/// Storage mode configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit offline mode: always use the local store
    #[serde(default)]
    pub offline: bool,
    /// Directory holding the local store file (empty disables local persistence)
    #[serde(default)]
    pub local_dir: String,
}

/// Remote structured store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the REST endpoint
    #[serde(default)]
    pub url: String,
    /// Public API key sent with every request
    #[serde(default)]
    pub anon_key: String,
    /// Table holding one row per student
    #[serde(default)]
    pub table: String,
}

/// Legacy spreadsheet store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyConfig {
    /// Spreadsheet values endpoint (`.../spreadsheets/<id>/values`)
    #[serde(default)]
    pub spreadsheet_url: String,
    /// Spreadsheet API key
    #[serde(default)]
    pub api_key: String,
    /// Sheet listing student logins
    #[serde(default)]
    pub user_sheet: String,
    /// Sheet listing saved plan maps
    #[serde(default)]
    pub records_sheet: String,
    /// Form receiving login submissions
    #[serde(default)]
    pub user_form_url: String,
    /// Form receiving plan map submissions
    #[serde(default)]
    pub graph_form_url: String,
    /// Form field for the student identifier
    #[serde(default)]
    pub student_entry: String,
    /// Form field for the plan identifier
    #[serde(default)]
    pub plan_entry: String,
    /// Form field for the track
    #[serde(default)]
    pub track_entry: String,
    /// Form field for the capstone track
    #[serde(default)]
    pub capstone_entry: String,
    /// Form field for the serialized plan map
    #[serde(default)]
    pub map_entry: String,
}

/// Degree-plan catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Plan identifier used for enrollment answers
    #[serde(default)]
    pub plan_id: String,
    /// Optional external catalog file (TOML); empty uses the embedded catalog
    #[serde(default)]
    pub path: String,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Storage mode settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Remote store settings
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Legacy spreadsheet settings
    #[serde(default)]
    pub legacy: LegacyConfig,
    /// Catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Optional overrides for configuration values (CLI flags or environment)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override logging level
    pub level: Option<String>,
    /// Override log file path
    pub file: Option<String>,
    /// Override verbose flag
    pub verbose: Option<bool>,
    /// Override offline mode
    pub offline: Option<bool>,
    /// Override local store directory
    pub local_dir: Option<String>,
    /// Override remote URL
    pub remote_url: Option<String>,
    /// Override remote key
    pub remote_key: Option<String>,
    /// Override catalog file
    pub catalog_path: Option<String>,
}

impl ConfigOverrides {
    /// Build overrides from the process environment.
    ///
    /// Reads [`ENV_OFFLINE`], [`ENV_REMOTE_URL`] and [`ENV_REMOTE_KEY`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build overrides from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            offline: non_empty(ENV_OFFLINE).map(|v| parse_flag(&v)),
            remote_url: non_empty(ENV_REMOTE_URL),
            remote_key: non_empty(ENV_REMOTE_KEY),
            ..Self::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    /// Get the `$PLAN_TRACKER` directory path
    ///
    /// Returns:
    /// - Linux: `~/.config/plantracker`
    /// - macOS: `~/Library/Application Support/plantracker`
    /// - Windows: `%APPDATA%\plantracker`
    #[must_use]
    pub fn get_plantracker_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plantracker")
    }

    /// Merge missing fields from defaults into this config
    ///
    /// Only fields that are empty here and non-empty in `defaults` are updated,
    /// so upgrading picks up new settings without touching user values.
    /// `storage.local_dir` is never filled: empty there disables local storage.
    ///
    /// # Returns
    ///
    /// `true` if any fields were added/changed, `false` otherwise
    pub fn merge_defaults(&mut self, defaults: &Self) -> bool {
        let mut changed = false;
        let mut fill = |target: &mut String, default: &String| {
            if target.is_empty() && !default.is_empty() {
                target.clone_from(default);
                changed = true;
            }
        };

        fill(&mut self.logging.level, &defaults.logging.level);
        fill(&mut self.logging.file, &defaults.logging.file);
        fill(&mut self.remote.table, &defaults.remote.table);

        let legacy = &mut self.legacy;
        let dl = &defaults.legacy;
        fill(&mut legacy.spreadsheet_url, &dl.spreadsheet_url);
        fill(&mut legacy.user_sheet, &dl.user_sheet);
        fill(&mut legacy.records_sheet, &dl.records_sheet);
        fill(&mut legacy.user_form_url, &dl.user_form_url);
        fill(&mut legacy.graph_form_url, &dl.graph_form_url);
        fill(&mut legacy.student_entry, &dl.student_entry);
        fill(&mut legacy.plan_entry, &dl.plan_entry);
        fill(&mut legacy.track_entry, &dl.track_entry);
        fill(&mut legacy.capstone_entry, &dl.capstone_entry);
        fill(&mut legacy.map_entry, &dl.map_entry);

        fill(&mut self.catalog.plan_id, &defaults.catalog.plan_id);

        changed
    }

    /// Apply overrides onto the loaded configuration
    ///
    /// Overrides never modify the persistent file. Only non-`None` values replace
    /// config values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(level) = &overrides.level {
            self.logging.level.clone_from(level);
        }
        if let Some(file) = &overrides.file {
            self.logging.file.clone_from(file);
        }
        if let Some(verbose) = overrides.verbose {
            self.logging.verbose = verbose;
        }
        if let Some(offline) = overrides.offline {
            self.storage.offline = offline;
        }
        if let Some(dir) = &overrides.local_dir {
            self.storage.local_dir = Self::expand_variables(dir);
        }
        if let Some(url) = &overrides.remote_url {
            self.remote.url.clone_from(url);
        }
        if let Some(key) = &overrides.remote_key {
            self.remote.anon_key.clone_from(key);
        }
        if let Some(path) = &overrides.catalog_path {
            self.catalog.path = Self::expand_variables(path);
        }
    }

    /// Get the user config file path (`config.toml`, or `dconfig.toml` in debug builds)
    #[must_use]
    pub fn get_config_file_path() -> PathBuf {
        Self::get_plantracker_dir().join(CONFIG_FILE_NAME)
    }

    /// Expand `$PLAN_TRACKER` in a string to the config directory
    #[must_use]
    fn expand_variables(value: &str) -> String {
        if value.contains(DIR_VARIABLE) {
            let dir = Self::get_plantracker_dir();
            value.replace(DIR_VARIABLE, dir.to_str().unwrap_or("."))
        } else {
            value.to_string()
        }
    }

    /// Initialize config from a TOML string
    ///
    /// Missing fields use their serde defaults. `$PLAN_TRACKER` is expanded in
    /// path-like values.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML cannot be parsed or doesn't match the expected schema
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(toml_str)?;

        config.logging.file = Self::expand_variables(&config.logging.file);
        config.storage.local_dir = Self::expand_variables(&config.storage.local_dir);
        config.catalog.path = Self::expand_variables(&config.catalog.path);

        Ok(config)
    }

    /// Load configuration from embedded defaults
    ///
    /// # Panics
    /// Panics if the embedded default configuration is invalid TOML.
    #[must_use]
    pub fn from_defaults() -> Self {
        Self::from_toml(CONFIG_DEFAULTS).expect("Failed to parse compiled-in default configuration")
    }

    /// Load configuration from file, or create from defaults if not found
    ///
    /// Existing files get newly-added default fields merged in and are re-saved.
    /// Any load error falls back to defaults.
    #[must_use]
    pub fn load() -> Self {
        let config_file = Self::get_config_file_path();
        let defaults = Self::from_defaults();

        if config_file.exists() {
            if let Ok(content) = fs::read_to_string(&config_file) {
                if let Ok(mut config) = Self::from_toml(&content) {
                    if config.merge_defaults(&defaults) {
                        let _ = config.save();
                    }
                    return config;
                }
            }
        } else {
            if let Some(parent) = config_file.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = defaults.save();
            return defaults;
        }

        defaults
    }

    /// Save configuration to the platform-specific config file
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created, the config cannot be
    /// serialized, or the file cannot be written.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_file = Self::get_config_file_path();
        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        fs::write(&config_file, toml_str)?;
        Ok(())
    }

    /// Get a configuration value by key
    ///
    /// Keys are field names; `-` and `_` are interchangeable. Returns `None` for
    /// unknown keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key.replace('-', "_").as_str() {
            "level" => self.logging.level.clone(),
            "file" => self.logging.file.clone(),
            "verbose" => self.logging.verbose.to_string(),
            "offline" => self.storage.offline.to_string(),
            "local_dir" => self.storage.local_dir.clone(),
            "remote_url" => self.remote.url.clone(),
            "remote_key" => self.remote.anon_key.clone(),
            "remote_table" => self.remote.table.clone(),
            "spreadsheet_url" => self.legacy.spreadsheet_url.clone(),
            "sheets_key" => self.legacy.api_key.clone(),
            "user_sheet" => self.legacy.user_sheet.clone(),
            "records_sheet" => self.legacy.records_sheet.clone(),
            "user_form_url" => self.legacy.user_form_url.clone(),
            "graph_form_url" => self.legacy.graph_form_url.clone(),
            "plan_id" => self.catalog.plan_id.clone(),
            "catalog" => self.catalog.path.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a configuration value by key
    ///
    /// Updates the in-memory config only; call [`save()`](Config::save) to persist.
    ///
    /// # Errors
    /// Returns an error if the key is not recognized or a boolean value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let parse_bool = |name: &str| {
            value
                .parse::<bool>()
                .map_err(|_| format!("Invalid boolean value for '{name}': '{value}'"))
        };
        match key.replace('-', "_").as_str() {
            "level" => self.logging.level = value.to_string(),
            "file" => self.logging.file = value.to_string(),
            "verbose" => self.logging.verbose = parse_bool("verbose")?,
            "offline" => self.storage.offline = parse_bool("offline")?,
            "local_dir" => self.storage.local_dir = value.to_string(),
            "remote_url" => self.remote.url = value.to_string(),
            "remote_key" => self.remote.anon_key = value.to_string(),
            "remote_table" => self.remote.table = value.to_string(),
            "spreadsheet_url" => self.legacy.spreadsheet_url = value.to_string(),
            "sheets_key" => self.legacy.api_key = value.to_string(),
            "user_sheet" => self.legacy.user_sheet = value.to_string(),
            "records_sheet" => self.legacy.records_sheet = value.to_string(),
            "user_form_url" => self.legacy.user_form_url = value.to_string(),
            "graph_form_url" => self.legacy.graph_form_url = value.to_string(),
            "plan_id" => self.catalog.plan_id = value.to_string(),
            "catalog" => self.catalog.path = value.to_string(),
            _ => return Err(format!("Unknown config key: '{key}'")),
        }
        Ok(())
    }

    /// Unset a configuration value by key (reset to the value in `defaults`)
    ///
    /// # Errors
    /// Returns an error if the key is not recognized.
    pub fn unset(&mut self, key: &str, defaults: &Self) -> Result<(), String> {
        let default = defaults
            .get(key)
            .ok_or_else(|| format!("Unknown config key: '{key}'"))?;
        self.set(key, &default)
    }

    /// Reset all configuration to defaults by deleting the config file
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be deleted.
    pub fn reset() -> Result<(), std::io::Error> {
        let config_file = Self::get_config_file_path();
        if config_file.exists() {
            fs::remove_file(config_file)?;
        }
        Ok(())
    }
}

fn masked(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        format!("{}…", secret.chars().take(4).collect::<String>())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[logging]")?;
        writeln!(f, "  level = \"{}\"", self.logging.level)?;
        writeln!(f, "  file = \"{}\"", self.logging.file)?;
        writeln!(f, "  verbose = {}", self.logging.verbose)?;

        writeln!(f, "\n[storage]")?;
        writeln!(f, "  offline = {}", self.storage.offline)?;
        writeln!(f, "  local_dir = \"{}\"", self.storage.local_dir)?;

        writeln!(f, "\n[remote]")?;
        writeln!(f, "  url = \"{}\"", self.remote.url)?;
        writeln!(f, "  anon_key = \"{}\"", masked(&self.remote.anon_key))?;
        writeln!(f, "  table = \"{}\"", self.remote.table)?;

        writeln!(f, "\n[legacy]")?;
        writeln!(f, "  spreadsheet_url = \"{}\"", self.legacy.spreadsheet_url)?;
        writeln!(f, "  api_key = \"{}\"", masked(&self.legacy.api_key))?;
        writeln!(f, "  user_sheet = \"{}\"", self.legacy.user_sheet)?;
        writeln!(f, "  records_sheet = \"{}\"", self.legacy.records_sheet)?;
        writeln!(f, "  user_form_url = \"{}\"", self.legacy.user_form_url)?;
        writeln!(f, "  graph_form_url = \"{}\"", self.legacy.graph_form_url)?;

        writeln!(f, "\n[catalog]")?;
        writeln!(f, "  plan_id = \"{}\"", self.catalog.plan_id)?;
        writeln!(f, "  path = \"{}\"", self.catalog.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_parse_offline_flag() {
        let overrides = ConfigOverrides::from_lookup(|key| match key {
            ENV_OFFLINE => Some("TRUE".to_string()),
            ENV_REMOTE_URL => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(overrides.offline, Some(true));
        assert!(overrides.remote_url.is_none());
        assert!(overrides.remote_key.is_none());
    }

    #[test]
    fn test_env_overrides_offline_false_values() {
        let overrides = ConfigOverrides::from_lookup(|key| {
            (key == ENV_OFFLINE).then(|| "0".to_string())
        });
        assert_eq!(overrides.offline, Some(false));
    }

    #[test]
    fn test_merge_defaults_keeps_disabled_local_dir() {
        let defaults = Config::from_defaults();
        let mut config = Config::from_defaults();
        config.set("local_dir", "").expect("Failed to clear local_dir");

        config.merge_defaults(&defaults);
        assert_eq!(config.storage.local_dir, "");
        assert!(!defaults.storage.local_dir.is_empty());
    }

    #[test]
    fn test_masked_secret() {
        assert_eq!(masked(""), "");
        assert_eq!(masked("abcdefgh"), "abcd…");
    }
}
