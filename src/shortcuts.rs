//! Shortcut storage
//!
//! Shortcuts are user-pinned directories shown in the root list. They are
//! kept in a JSON file in the app data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::entry::Entry;
use crate::error::StoreError;
use crate::roots::{RootDescriptor, Section};

/// A pinned directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcut {
    /// URL of the target directory
    pub url: String,
    /// Display label
    pub label: String,
    /// Timestamp when pinned (unix epoch seconds)
    pub added_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ShortcutsData {
    version: u32,
    shortcuts: Vec<Shortcut>,
}

const SHORTCUTS_VERSION: u32 = 1;

/// Shortcut file at a fixed path
#[derive(Debug, Clone)]
pub struct ShortcutStore {
    path: PathBuf,
}

impl ShortcutStore {
    /// Store in the app data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = dirs::data_dir()
            .map(|p| p.join("spacetree").join("shortcuts.json"))
            .ok_or(StoreError::NoDataDir)?;
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ShortcutsData {
        if !self.path.exists() {
            return ShortcutsData::default();
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("[Shortcuts] Ignoring malformed {:?}: {}", self.path, e);
                ShortcutsData::default()
            }),
            Err(e) => {
                tracing::warn!("[Shortcuts] Failed to read {:?}: {}", self.path, e);
                ShortcutsData::default()
            }
        }
    }

    fn save(&self, data: &ShortcutsData) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// All shortcuts, oldest first.
    pub fn list(&self) -> Vec<Shortcut> {
        self.load().shortcuts
    }

    /// Pin `entry`. Only directories can be pinned, and only once.
    pub fn add(&self, entry: &Entry) -> Result<Shortcut, StoreError> {
        if !entry.is_directory() {
            return Err(StoreError::Invalid(format!(
                "not a directory: {}",
                entry.url()
            )));
        }

        let mut data = self.load();
        if data.shortcuts.iter().any(|s| s.url == entry.url()) {
            return Err(StoreError::Invalid(format!(
                "already a shortcut: {}",
                entry.url()
            )));
        }

        let added_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let shortcut = Shortcut {
            url: entry.url().to_string(),
            label: entry.name().to_string(),
            added_at,
        };

        data.shortcuts.push(shortcut.clone());
        data.version = SHORTCUTS_VERSION;
        self.save(&data)?;
        tracing::debug!("[Shortcuts] Added {}", shortcut.url);
        Ok(shortcut)
    }

    pub fn remove(&self, url: &str) -> Result<(), StoreError> {
        let mut data = self.load();
        let original_len = data.shortcuts.len();
        data.shortcuts.retain(|s| s.url != url);
        if data.shortcuts.len() == original_len {
            return Err(StoreError::Invalid(format!("not a shortcut: {}", url)));
        }
        self.save(&data)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.load().shortcuts.iter().any(|s| s.url == url)
    }

    /// Remove every shortcut, returning how many there were.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let count = self.load().shortcuts.len();
        self.save(&ShortcutsData {
            version: SHORTCUTS_VERSION,
            shortcuts: Vec::new(),
        })?;
        Ok(count)
    }

    /// Root descriptors for the stored shortcuts, all in `section`.
    pub fn descriptors(&self, section: Section) -> Vec<RootDescriptor> {
        self.list()
            .into_iter()
            .map(|s| RootDescriptor::shortcut(Entry::directory(s.url), section).with_label(s.label))
            .collect()
    }
}
