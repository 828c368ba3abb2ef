//! Sync settings stored in `~/.apireg/config.json`.
//!
//! Resolution priority for every setting: environment variable, then the
//! config file, then the built-in default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::SyncMode;
use crate::sync::DEFAULT_FETCH_TIMEOUT;

/// Whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default)]
    pub sync: Option<SyncSettings>,
}

/// The `sync` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    /// Default mode for `sync refresh-all`.
    #[serde(default)]
    pub refresh_mode: Option<SyncMode>,
}

/// Get the config file path.
///
/// # Errors
///
/// Returns `Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    super::global_apireg_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the config file, or defaults if it does not exist.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config() -> Result<RegistryConfig> {
    load_config_from(&config_path()?)
}

/// Load a config file from an explicit location.
///
/// # Errors
///
/// Returns `Config` if the file exists but cannot be read or parsed.
pub fn load_config_from(path: &Path) -> Result<RegistryConfig> {
    if !path.exists() {
        return Ok(RegistryConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

fn sync_settings() -> SyncSettings {
    match load_config() {
        Ok(config) => config.sync.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config file");
            SyncSettings::default()
        }
    }
}

/// Resolve the fetch timeout.
///
/// Priority: `APIREG_FETCH_TIMEOUT_SECS` > `sync.fetchTimeoutSecs` > 10 seconds.
#[must_use]
pub fn resolve_fetch_timeout() -> Duration {
    if let Some(secs) = std::env::var("APIREG_FETCH_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
    {
        return Duration::from_secs(secs);
    }

    sync_settings()
        .fetch_timeout_secs
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_FETCH_TIMEOUT, Duration::from_secs)
}

/// Resolve the default mode for batch refreshes.
///
/// Priority: `APIREG_REFRESH_MODE` > `sync.refreshMode` > MERGE.
#[must_use]
pub fn resolve_refresh_mode() -> SyncMode {
    if let Some(mode) = std::env::var("APIREG_REFRESH_MODE")
        .ok()
        .and_then(|v| v.parse::<SyncMode>().ok())
    {
        return mode;
    }

    sync_settings().refresh_mode.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn test_reads_camel_case_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"sync": {"fetchTimeoutSecs": 30, "refreshMode": "REPLACE"}}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(
            config.sync,
            Some(SyncSettings {
                fetch_timeout_secs: Some(30),
                refresh_mode: Some(SyncMode::Replace),
            })
        );
    }

    #[test]
    fn test_unknown_sections_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        assert_eq!(load_config_from(&path).unwrap(), RegistryConfig::default());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_config_from(&path), Err(Error::Config(_))));
    }
}
