//! File locations used by the plugin

use crate::error::CoreError;
use std::path::PathBuf;

const APP_DIR: &str = "projlog";
const SETTINGS_FILE: &str = "settings.json";

/// Where settings and monthly logs live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// JSON settings file holding the export toggle
    pub settings_path: PathBuf,
    /// Directory receiving `logs_YYYYMM.csv` files
    pub log_dir: PathBuf,
}

impl LoggerConfig {
    pub fn new(settings_path: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
            log_dir: log_dir.into(),
        }
    }
}

pub fn default_settings_path() -> Result<PathBuf, CoreError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
        .ok_or(CoreError::UserDirectoryNotFound { kind: "config" })
}

pub fn default_log_dir() -> Result<PathBuf, CoreError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join("logs"))
        .ok_or(CoreError::UserDirectoryNotFound { kind: "data" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_locations_are_app_scoped() {
        if let Ok(path) = default_settings_path() {
            assert!(path.ends_with("projlog/settings.json"));
        }
        if let Ok(dir) = default_log_dir() {
            assert!(dir.ends_with("projlog/logs"));
        }
    }

    #[test]
    fn test_new_keeps_paths() {
        let config = LoggerConfig::new("/etc/projlog/settings.json", "/shared/logs");
        assert_eq!(config.settings_path, PathBuf::from("/etc/projlog/settings.json"));
        assert_eq!(config.log_dir, PathBuf::from("/shared/logs"));
    }
}
