//! Configuration types for the response window.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, WindowError};

/// Text shown when a render request carries no content and nothing is persisted.
pub const DEFAULT_CONTENT: &str = "There is no content available.";

/// Top-level configuration for the display surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Markdown rendering settings.
    pub render: RenderConfig,
    /// Control surface settings.
    pub ui: UiConfig,
    /// Inbound queue and outbound event settings.
    pub runtime: RuntimeConfig,
    /// Persisted state settings.
    pub store: StoreConfig,
}

/// Markdown rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// `syntect` theme used for fenced code blocks.
    pub theme: String,
    /// Turn bare URLs into links.
    pub linkify: bool,
    /// Smart quotes, dashes and ellipses.
    pub typographer: bool,
    /// Pass raw HTML in the source through to the output.
    pub allow_html: bool,
    /// TeX macros expanded before math is handed to the typesetter.
    pub math_macros: BTreeMap<String, String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let mut math_macros = BTreeMap::new();
        math_macros.insert("\\RR".to_owned(), "\\mathbb{R}".to_owned());
        Self {
            theme: "base16-ocean.dark".to_owned(),
            linkify: true,
            typographer: true,
            allow_html: true,
            math_macros,
        }
    }
}

/// Control surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long the copy button shows its "Copied!" feedback.
    pub copied_feedback_ms: u64,
    /// Document source used when a render carries no content.
    pub default_content: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            copied_feedback_ms: 2_000,
            default_content: DEFAULT_CONTENT.to_owned(),
        }
    }
}

/// Inbound queue / outbound broadcast sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the single-consumer inbound queue.
    pub queue_capacity: usize,
    /// Capacity of the outbound event broadcast channel.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            event_capacity: 128,
        }
    }
}

/// Persisted state configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// State file location (None = `paths::state_file()`).
    pub state_file: Option<PathBuf>,
}

impl StoreConfig {
    /// The effective state file path.
    #[must_use]
    pub fn resolved_state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(crate::paths::state_file)
    }
}

impl WindowConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WindowError::Config(e.to_string()))
    }

    /// Load from `path` if given, else from the default location when it
    /// exists, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let default_path = crate::paths::config_file();
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WindowError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_matches_window_defaults() {
        let config = WindowConfig::default();
        assert_eq!(config.ui.copied_feedback_ms, 2_000);
        assert_eq!(config.ui.default_content, DEFAULT_CONTENT);
        assert_eq!(config.render.theme, "base16-ocean.dark");
        assert_eq!(
            config.render.math_macros.get("\\RR").map(String::as_str),
            Some("\\mathbb{R}")
        );
        assert!(config.runtime.queue_capacity > 0);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = WindowConfig::default();
        config.ui.copied_feedback_ms = 500;
        config.render.linkify = false;
        config
            .render
            .math_macros
            .insert("\\NN".to_owned(), "\\mathbb{N}".to_owned());

        config.save_to_file(&path).expect("save");
        let loaded = WindowConfig::from_file(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: WindowConfig = toml::from_str("[ui]\ncopied_feedback_ms = 10\n").expect("parse");
        assert_eq!(parsed.ui.copied_feedback_ms, 10);
        assert_eq!(parsed.ui.default_content, DEFAULT_CONTENT);
        assert!(parsed.render.typographer);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = WindowConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_invalid_toml_returns_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write");

        let result = WindowConfig::from_file(&path);
        assert!(matches!(result, Err(WindowError::Config(_))));
    }

    #[test]
    fn explicit_state_file_wins() {
        let store = StoreConfig {
            state_file: Some(PathBuf::from("/tmp/x/state.json")),
        };
        assert_eq!(store.resolved_state_file(), PathBuf::from("/tmp/x/state.json"));
    }
}
