//! Configuration management.
//!
//! This module provides functions for locating the registry's global
//! directory, resolving the database path and actor, and loading the
//! sync settings in `~/.apireg/config.json`.
//!
//! Everything lives under one global directory:
//! - **Database**: `~/.apireg/data/registry.db`
//! - **Settings**: `~/.apireg/config.json`

mod settings;

pub use settings::{
    config_path, load_config, load_config_from, resolve_fetch_timeout, resolve_refresh_mode,
    RegistryConfig, SyncSettings,
};

use std::path::{Path, PathBuf};

/// Get the global registry directory (`~/.apireg/`).
#[must_use]
pub fn global_apireg_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".apireg"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `APIREG_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("APIREG_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path (`~/.apireg/test/registry.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_apireg_dir().map(|dir| dir.join("test").join("registry.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided (`--db` flag), use it directly
/// 2. `APIREG_TEST_DB` environment variable → uses test database
/// 3. `APIREG_DB` environment variable
/// 4. Global location: `~/.apireg/data/registry.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no home directory is known.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("APIREG_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_apireg_dir().map(|dir| dir.join("data").join("registry.db"))
}

/// Get the default actor name recorded on audit events.
///
/// Priority:
/// 1. `APIREG_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("APIREG_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        assert!(!default_actor().is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/registry.db");
        assert_eq!(resolve_db_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_apireg_dir().unwrap();
        let test = test_db_path().unwrap();

        assert!(test.to_string_lossy().contains("/test/"));
        assert!(test.ends_with("registry.db"));
        assert_ne!(global.join("data").join("registry.db"), test);
    }

    #[test]
    fn test_truthy_values() {
        for falsy in ["", "0", "false", "FALSE"] {
            assert!(!is_truthy(falsy), "{falsy:?} should be falsy");
        }
        for truthy in ["1", "true", "yes"] {
            assert!(is_truthy(truthy), "{truthy:?} should be truthy");
        }
    }
}
