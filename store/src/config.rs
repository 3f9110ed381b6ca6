//! Application configuration.
//!
//! Values are layered:
//! 1. Compiled-in defaults
//! 2. `config.json` in the data directory, when present. Only the fields it
//!    names are overridden.
//!
//! The data directory itself comes from:
//! 1. TERRITORIO_DATA_DIR environment variable
//! 2. The platform data directory (e.g. ~/.local/share/territorio)
//! 3. ./data (fallback for development)
//!
//! Relative paths in the configuration are resolved against the data directory.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
const DATA_DIR_ENV: &str = "TERRITORIO_DATA_DIR";
const DEV_DATA_DIR: &str = "./data";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub backup_dir: PathBuf,
    pub backup_interval_days: u32,
    pub auto_backup: bool,
    pub backup_retention_days: u32,
    pub max_backup_files: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database/territorios.db"),
            backup_dir: PathBuf::from("backups"),
            backup_interval_days: 7,
            auto_backup: true,
            backup_retention_days: 30,
            max_backup_files: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: String,
    pub language: String,
    pub font_size: String,
    pub show_welcome: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            language: "pt_BR".to_string(),
            font_size: "normal".to_string(),
            show_welcome: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub remember_login: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 30,
            remember_login: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub check_interval_minutes: u32,
    pub show_assignment_alerts: bool,
    /// How many days before an assignment's return date alerts start.
    pub alert_days_before: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: 15,
            show_assignment_alerts: true,
            alert_days_before: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub default_export_format: String,
    pub logo_path: PathBuf,
    pub max_cached_reports: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_export_format: "pdf".to_string(),
            logo_path: PathBuf::from("resources/logo.png"),
            max_cached_reports: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub icons: PathBuf,
    pub styles: PathBuf,
    pub templates: PathBuf,
    pub exports: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            icons: PathBuf::from("resources/icons"),
            styles: PathBuf::from("resources/styles"),
            templates: PathBuf::from("resources/templates"),
            exports: PathBuf::from("exports"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_level: "INFO".to_string(),
            log_to_file: true,
            log_file: PathBuf::from("logs/app.log"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ui: UiConfig,
    pub session: SessionConfig,
    pub notifications: NotificationConfig,
    pub reports: ReportConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
    /// Base for every relative path above.
    #[serde(skip)]
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load the configuration for `data_dir`, reading its `config.json` if present.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let file = data_dir.join(CONFIG_FILE_NAME);
        let mut config = if file.exists() {
            Self::from_file(&file)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Parse a JSON configuration document. Sections and fields it leaves
    /// out keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.resolve(&self.database.backup_dir)
    }

    pub fn log_file(&self) -> PathBuf {
        self.resolve(&self.debug.log_file)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.resolve(&self.paths.exports)
    }

    /// `path` if absolute, otherwise joined onto the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

/// Get the data directory.
///
/// Priority:
/// 1. TERRITORIO_DATA_DIR env variable if set
/// 2. the platform data directory if one can be determined
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "territorio") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir_fallback() {
        // Returns the env override when TERRITORIO_DATA_DIR is set
        let dir = get_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.session.timeout_minutes, 30);
        assert_eq!(config.notifications.alert_days_before, 5);
        assert_eq!(config.database.max_backup_files, 10);
        assert_eq!(
            config.database_path(),
            dir.path().join("database/territorios.db")
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"session": {"timeout_minutes": 90}, "ui": {"theme": "dark"}, "extra": 1}"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.session.timeout_minutes, 90);
        assert!(!config.session.remember_login);
        assert_eq!(config.ui.theme, "dark");
        assert_eq!(config.ui.language, "pt_BR");
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::load(dir.path()).unwrap();
        let elsewhere = dir.path().join("elsewhere").join("db.sqlite");
        config.database.path = elsewhere.clone();
        assert_eq!(config.database_path(), elsewhere);
    }
}
