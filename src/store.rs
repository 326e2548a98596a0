//! Persisted display state that survives a reload of the surface.
//!
//! Two independent string slots: the last fully rendered document source and
//! the last history-toggle label. The file layout is a flat JSON object keyed
//! by [`StateKey::as_str`]; there is no versioning, and a missing file or key
//! simply reads as absent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, WindowError};

/// Logical keys of the persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
    /// Last fully rendered document source.
    LastSource,
    /// Last history-toggle label text.
    LastLabel,
}

impl StateKey {
    /// Storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LastSource => "preMarkdownText",
            Self::LastLabel => "chatHistoryButtonText",
        }
    }
}

/// Key/value persistence for the display surface.
pub trait StateStore {
    fn save(&mut self, key: StateKey, value: &str) -> Result<()>;
    fn load(&self, key: StateKey) -> Result<Option<String>>;
}

/// In-process store. Used by tests and by the bridge's `--ephemeral` mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<StateKey, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save(&mut self, key: StateKey, value: &str) -> Result<()> {
        self.entries.insert(key, value.to_owned());
        Ok(())
    }

    fn load(&self, key: StateKey) -> Result<Option<String>> {
        Ok(self.entries.get(&key).cloned())
    }
}

/// JSON file store, rewritten atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, reading existing entries if the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&path, &raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "opened state store");
        Ok(Self { path, entries })
    }

    /// Like [`FileStore::open`], but a file that does not parse is moved
    /// aside to `*.json.corrupt` and the store starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or moved aside.
    pub fn open_or_reset(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::open(&path) {
            Err(WindowError::Store(reason)) => {
                let aside = path.with_extension("json.corrupt");
                tracing::warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    %reason,
                    "state file unreadable; starting with empty state"
                );
                std::fs::rename(&path, &aside)?;
                Ok(Self {
                    path,
                    entries: BTreeMap::new(),
                })
            }
            other => other,
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| WindowError::Store(format!("failed to serialize state: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn parse_entries(path: &Path, raw: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(raw)
        .map_err(|e| WindowError::Store(format!("failed to parse {}: {e}", path.display())))
}

impl StateStore for FileStore {
    fn save(&mut self, key: StateKey, value: &str) -> Result<()> {
        self.entries.insert(key.as_str().to_owned(), value.to_owned());
        self.flush()
    }

    fn load(&self, key: StateKey) -> Result<Option<String>> {
        Ok(self.entries.get(key.as_str()).cloned())
    }
}
