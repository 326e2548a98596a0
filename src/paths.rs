//! Application directory paths for the response window.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! # Environment Overrides
//!
//! - `RESPONSE_WINDOW_DATA_DIR` overrides [`data_dir`]
//! - `RESPONSE_WINDOW_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the persisted display state. Resolves to
/// `dirs::data_dir()/response-window/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("RESPONSE_WINDOW_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("response-window"))
        .unwrap_or_else(|| PathBuf::from("/tmp/response-window-data"))
}

/// Application config directory.
///
/// Resolves to `dirs::config_dir()/response-window/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("RESPONSE_WINDOW_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("response-window"))
        .unwrap_or_else(|| PathBuf::from("/tmp/response-window-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Persisted display state (`data_dir()/state.json`).
#[must_use]
pub fn state_file() -> PathBuf {
    data_dir().join("state.json")
}
