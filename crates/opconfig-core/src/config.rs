/*!
 * Library settings for opconfig.
 *
 * These are the settings of the library itself (where the profile store lives,
 * how verbose logging is), not the routine configuration values it manages.
 * Settings are layered: built-in defaults, then an optional settings file,
 * then environment variables.
 */
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default environment variable prefix, e.g. `OPCONFIG__STORAGE__PATH`
pub const ENV_PREFIX: &str = "OPCONFIG";

/// Library settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Profile store settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where and how the profile store is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Path of the JSON file holding every routine's profiles
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Pretty-print the JSON file so it diffs well
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log filter (trace, debug, info, warn, error, or a directive list)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target in log lines
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            pretty: default_pretty(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: default_with_target(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./opconfig.json")
}

fn default_pretty() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

/// A builder for layered [`Settings`]
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings_file: Option<PathBuf>,
    environment_prefix: Option<String>,
    override_with: Option<Settings>,
}

impl SettingsBuilder {
    /// Create a new SettingsBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a file; a missing file is skipped
    pub fn with_settings_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.settings_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Read settings from environment variables with this prefix
    pub fn with_environment_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.as_ref().to_string());
        self
    }

    /// Replace the layered result with these settings
    pub fn override_with(mut self, settings: Settings) -> Self {
        self.override_with = Some(settings);
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<Settings> {
        if let Some(settings) = self.override_with {
            return Ok(settings);
        }

        let defaults = Config::try_from(&Settings::default())
            .map_err(|e| Error::config(format!("Failed to create default settings: {}", e)))?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = self.settings_file {
            if path.exists() {
                debug!("Loading settings from {}", path.display());
                builder = builder.add_source(File::from(path.as_path()));
            } else {
                debug!("Settings file {} does not exist, using defaults", path.display());
            }
        }

        if let Some(prefix) = self.environment_prefix {
            debug!("Loading settings from environment variables with prefix {}", prefix);
            builder = builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings: Settings = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build settings: {}", e)))?
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize settings: {}", e)))?;

        info!("Settings loaded, store at {}", settings.storage.path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::tempdir;
    use test_log::test;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.storage.path, PathBuf::from("./opconfig.json"));
        assert!(settings.storage.pretty);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.logging.with_target);
    }

    #[test]
    fn test_builder_defaults() {
        let settings = SettingsBuilder::new().build().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_builder_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = SettingsBuilder::new()
            .with_settings_file(dir.path().join("absent.toml"))
            .build()
            .unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_builder_with_file() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("opconfig.toml");
        fs::write(
            &file_path,
            br#"
                [storage]
                path = "/sdcard/FIRST/opconfig.json"
                pretty = false

                [logging]
                level = "debug"
            "#,
        )?;

        let settings = SettingsBuilder::new().with_settings_file(&file_path).build()?;

        assert_eq!(settings.storage.path, PathBuf::from("/sdcard/FIRST/opconfig.json"));
        assert!(!settings.storage.pretty);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.with_target);

        Ok(())
    }

    #[test]
    fn test_builder_with_env() -> Result<()> {
        env::set_var("OPCFGTEST__STORAGE__PATH", "/tmp/env-store.json");
        env::set_var("OPCFGTEST__LOGGING__LEVEL", "trace");

        let settings = SettingsBuilder::new()
            .with_environment_prefix("OPCFGTEST")
            .build()?;

        assert_eq!(settings.storage.path, PathBuf::from("/tmp/env-store.json"));
        assert_eq!(settings.logging.level, "trace");

        env::remove_var("OPCFGTEST__STORAGE__PATH");
        env::remove_var("OPCFGTEST__LOGGING__LEVEL");

        Ok(())
    }

    #[test]
    fn test_override_with() {
        let mut custom = Settings::default();
        custom.storage.pretty = false;
        let settings = SettingsBuilder::new().override_with(custom.clone()).build().unwrap();
        assert_eq!(settings, custom);
    }
}
