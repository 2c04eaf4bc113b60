//! # Sync Configuration
//!
//! Configuration for the sync engine, stored as a TOML file in the
//! platform config directory.
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [spreadsheet]
//! spreadsheet_id = "1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"
//! menu_sheet_name = "Menus"
//! receipt_sheet_name = "Receipts"
//!
//! [sync]
//! interval_secs = 300        # periodic trigger cadence
//! remote_timeout_secs = 10   # bound per remote call
//! ```
//!
//! Missing keys fall back to defaults; a missing file yields the whole
//! default config so the app stays usable before first setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncResult;

// =============================================================================
// Spreadsheet Configuration
// =============================================================================

/// Which spreadsheet holds the shared data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Google Sheets document id. Empty until first setup.
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Sheet (tab) holding the menu catalog.
    #[serde(default = "default_menu_sheet")]
    pub menu_sheet_name: String,

    /// Sheet (tab) holding the receipts.
    #[serde(default = "default_receipt_sheet")]
    pub receipt_sheet_name: String,
}

fn default_menu_sheet() -> String {
    "Menus".to_string()
}

fn default_receipt_sheet() -> String {
    "Receipts".to_string()
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        SpreadsheetConfig {
            spreadsheet_id: String::new(),
            menu_sheet_name: default_menu_sheet(),
            receipt_sheet_name: default_receipt_sheet(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Cadence of the periodic sync trigger, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Bound applied to every remote call; a call past this is a
    /// per-entity timeout failure, not a round abort.
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_remote_timeout_secs() -> u64 {
    10
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            interval_secs: default_interval_secs(),
            remote_timeout_secs: default_remote_timeout_secs(),
        }
    }
}

// =============================================================================
// Sync Config
// =============================================================================

/// Full sync engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Default config file location for this platform.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("jp", "salon", "salon-pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Loads the config from a TOML file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&raw)?;
        debug!(path = %path.display(), "Loaded sync config");
        Ok(config)
    }

    /// Loads from `path` (or the platform default location), falling
    /// back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let Some(path) = path.or_else(Self::default_path) else {
            return SyncConfig::default();
        };
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Using default sync config");
                SyncConfig::default()
            }
        }
    }

    /// Saves the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::error::SyncError::ConfigSaveFailed(e.to_string()))?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .map_err(|e| crate::error::SyncError::ConfigSaveFailed(e.to_string()))?;
        debug!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// The per-call remote timeout as a `Duration`.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.remote_timeout_secs)
    }

    /// The periodic trigger cadence as a `Duration`.
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.spreadsheet.menu_sheet_name, "Menus");
        assert_eq!(config.spreadsheet.receipt_sheet_name, "Receipts");
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.sync.remote_timeout_secs, 10);
        assert_eq!(config.remote_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_falls_back_per_key() {
        let config: SyncConfig = toml::from_str(
            r#"
            [spreadsheet]
            spreadsheet_id = "abc123"

            [sync]
            remote_timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.spreadsheet.spreadsheet_id, "abc123");
        assert_eq!(config.spreadsheet.menu_sheet_name, "Menus");
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.sync.remote_timeout_secs, 3);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SyncConfig::default();
        config.spreadsheet.spreadsheet_id = "abc123".into();

        let raw = toml::to_string_pretty(&config).unwrap();
        let back: SyncConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.spreadsheet.spreadsheet_id, "abc123");
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let config = SyncConfig::load_or_default(Some(PathBuf::from("/nonexistent/sync.toml")));
        assert_eq!(config.sync.interval_secs, 300);
    }
}
