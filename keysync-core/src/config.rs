//! YAML sync configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.keysync/
//!   config.yaml   (mode 0600, created by `keysync init`)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home, used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// Connection settings for the translation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL, e.g. `https://translate.example.com`.
    pub url: String,
    /// Optional bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Editor identifier understood by the translation service (e.g. `vscode`).
    pub editor: String,
    /// The editor's own keybinding file.
    pub native_path: PathBuf,
    /// The cross-editor keymap file.
    pub shared_path: PathBuf,
    pub service: ServiceConfig,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.keysync/`
pub fn keysync_dir_at(home: &Path) -> PathBuf {
    home.join(".keysync")
}

/// `<home>/.keysync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    keysync_dir_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.keysync/config.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    let dir = keysync_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &SyncConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write `config` unless a config already exists.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_at(home: &Path, config: SyncConfig) -> Result<SyncConfig, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }
    save_at(home, &config)?;
    Ok(config)
}

/// `init_at` convenience wrapper.
pub fn init(config: SyncConfig) -> Result<SyncConfig, ConfigError> {
    init_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_when_optional_fields_missing() {
        let yaml = "editor: vscode\nnative_path: /a/keybindings.json\nshared_path: /b/keymap.yaml\nservice:\n  url: http://localhost:8080\n";
        let config: SyncConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.service.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.service.token.is_none());
    }

    #[test]
    fn token_is_omitted_from_yaml_when_absent() {
        let config = SyncConfig {
            editor: "zed".into(),
            native_path: PathBuf::from("/a"),
            shared_path: PathBuf::from("/b"),
            service: ServiceConfig {
                url: "http://localhost".into(),
                token: None,
                timeout_secs: 5,
            },
            debounce_ms: 100,
        };
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        assert!(!yaml.contains("token"), "got: {yaml}");
    }
}
