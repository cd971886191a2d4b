//! Tree settings storage
//!
//! Stores user preferences in a JSON file in the app data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Tree settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    /// Settings version for future migrations
    pub version: u32,
    /// Show hidden directories (names starting with .)
    pub show_hidden_dirs: bool,
    /// Gitignore-style patterns of directories never shown
    pub ignore_patterns: Vec<String>,
    /// Show virtual entries (offline, shared with me) under cloud drives
    pub fake_entries_visible: bool,
    /// Entries per page for the local file system provider
    pub read_page_size: usize,
    /// Debounce window for file system change events
    pub watch_debounce_ms: u64,
    /// Upper bound on parent lookups when a changed directory is gone
    /// (None = number of path segments of the changed entry)
    pub max_change_walk_depth: Option<usize>,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            show_hidden_dirs: false,
            ignore_patterns: vec![
                ".git".to_string(),
                ".svn".to_string(),
                ".hg".to_string(),
                "node_modules".to_string(),
            ],
            fake_entries_visible: true,
            read_page_size: 100,
            watch_debounce_ms: 800,
            max_change_walk_depth: None,
        }
    }
}

impl TreeSettings {
    /// Add an ignore pattern unless it is already present
    pub fn add_ignore_pattern(&mut self, pattern: &str) {
        if !self.ignore_patterns.iter().any(|p| p == pattern) {
            self.ignore_patterns.push(pattern.to_string());
        }
    }

    pub fn remove_ignore_pattern(&mut self, pattern: &str) {
        self.ignore_patterns.retain(|p| p != pattern);
    }
}

const SETTINGS_VERSION: u32 = 1;

/// Get the data directory path
fn get_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("spacetree"))
}

/// Get the settings file path
pub fn get_settings_path() -> Option<PathBuf> {
    get_data_dir().map(|p| p.join("settings.json"))
}

/// Load settings from the default location
pub fn load_settings() -> TreeSettings {
    match get_settings_path() {
        Some(path) => load_settings_from(&path),
        None => TreeSettings::default(),
    }
}

/// Load settings from `path`, falling back to defaults on any error
pub fn load_settings_from(path: &Path) -> TreeSettings {
    if !path.exists() {
        return TreeSettings::default();
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            let settings: TreeSettings = serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("[Settings] Ignoring malformed {:?}: {}", path, e);
                TreeSettings::default()
            });
            if settings.version < SETTINGS_VERSION {
                tracing::debug!("[Settings] Upgrading settings from v{}", settings.version);
            }
            settings
        }
        Err(e) => {
            tracing::warn!("[Settings] Failed to read {:?}: {}", path, e);
            TreeSettings::default()
        }
    }
}

/// Save settings to `path`, creating parent directories
pub fn save_settings_to(path: &Path, settings: &TreeSettings) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let mut settings = settings.clone();
    settings.version = SETTINGS_VERSION;

    let content = serde_json::to_string_pretty(&settings)?;
    fs::write(path, content).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Update settings stored at `path`
pub fn update_setting_at<F>(path: &Path, updater: F) -> Result<TreeSettings, StoreError>
where
    F: FnOnce(&mut TreeSettings),
{
    let mut settings = load_settings_from(path);
    updater(&mut settings);
    save_settings_to(path, &settings)?;
    Ok(settings)
}
