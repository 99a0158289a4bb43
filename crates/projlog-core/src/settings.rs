//! Export toggle persistence
//!
//! Stores the single `ExportEnabled` flag in a small JSON file shared by every
//! host process of the user. Nothing is cached in memory: each read goes to
//! disk so concurrent host windows always see the latest value.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn default_export_enabled() -> bool {
    true
}

/// Persisted plugin settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether closing a project appends a row to the monthly log
    #[serde(rename = "ExportEnabled", default = "default_export_enabled")]
    pub export_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_enabled: default_export_enabled(),
        }
    }
}

impl Settings {
    /// Strict load, reporting what went wrong.
    pub fn try_load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CoreError::JsonParse {
            path: path.to_path_buf(),
            message: source.to_string(),
            source,
        })
    }

    /// Load settings, returning defaults on any I/O or parse error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(e) => {
                debug!(error = %e, "Settings unavailable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist settings, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CoreError::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|source| CoreError::Serialize { source })?;
        std::fs::write(path, content).map_err(|source| CoreError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// File-backed store for the export toggle
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current export flag. Any read failure resolves to `true`.
    pub fn is_export_enabled(&self) -> bool {
        Settings::load(&self.path).export_enabled
    }

    /// Best-effort write; failures are logged and dropped.
    pub fn set_export_enabled(&self, enabled: bool) {
        let settings = Settings {
            export_enabled: enabled,
        };
        match settings.save(&self.path) {
            Ok(()) => debug!(enabled, path = %self.path.display(), "Export setting saved"),
            Err(e) => warn!(error = %e, enabled, "Failed to persist export setting"),
        }
    }

    /// Flip the export flag and return the new state.
    pub fn toggle(&self) -> bool {
        let enabled = !self.is_export_enabled();
        self.set_export_enabled(enabled);
        enabled
    }
}
