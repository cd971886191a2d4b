//! Namespace entries, volumes and location info
//!
//! An [`Entry`] is identified by its canonical URL. URL ordering is the total
//! order used to tell two entries apart; display order is decided by the
//! sort policies in [`crate::sort`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Whether an entry can hold children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// A node of the external namespace.
///
/// Equality, hashing and ordering only look at the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    url: String,
    name: String,
    full_path: String,
    kind: EntryKind,
}

impl Entry {
    /// Create a directory entry, deriving name and full path from the URL.
    pub fn directory(url: impl Into<String>) -> Self {
        Self::with_kind(url.into(), EntryKind::Directory)
    }

    /// Create a file entry, deriving name and full path from the URL.
    pub fn file(url: impl Into<String>) -> Self {
        Self::with_kind(url.into(), EntryKind::File)
    }

    fn with_kind(url: String, kind: EntryKind) -> Self {
        let full_path = full_path_of(&url).to_string();
        let name = full_path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            url,
            name,
            full_path,
            kind,
        }
    }

    /// Override the display name (volume roots and fake entries).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path below the URL authority, always starting with `/`.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Entry) -> bool {
        let base = ancestor.url.trim_end_matches('/');
        self.url.len() > base.len()
            && self.url.starts_with(base)
            && self.url[base.len()..].starts_with('/')
    }

    /// True when `other` is `self` or lies below it.
    pub fn contains(&self, other: &Entry) -> bool {
        self == other || other.is_descendant_of(self)
    }

    /// Number of non-empty path segments below the authority.
    pub fn depth(&self) -> usize {
        self.full_path.split('/').filter(|s| !s.is_empty()).count()
    }

    /// URL of the containing directory, computed from the path alone.
    pub fn parent_url(&self) -> Option<String> {
        if self.depth() == 0 {
            return None;
        }
        let trimmed = self.url.trim_end_matches('/');
        trimmed.rfind('/').map(|idx| trimmed[..idx].to_string())
    }
}

/// Strip `scheme://authority` from a URL.
fn full_path_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Entry {}

impl Hash for Entry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.url.cmp(&other.url)
    }
}

/// Kind of a mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeType {
    Local,
    Drive,
    Removable,
    Archive,
    /// Provided by an extension; every read is expensive
    Provided,
    MediaView,
    Mtp,
    Smb,
    Android,
    Crostini,
}

impl VolumeType {
    /// Volumes whose reads are slow enough that subtrees must not be
    /// pre-fetched.
    pub fn is_high_latency(self) -> bool {
        matches!(self, Self::Provided)
    }

    /// Media views list flattened files, never subdirectories.
    pub fn shows_subdirectories(self) -> bool {
        !matches!(self, Self::MediaView)
    }
}

/// Description of a mounted volume, owned by the namespace provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub volume_id: String,
    pub volume_type: VolumeType,
    pub label: String,
    /// Backing container of the shared drives grouping, when enabled
    #[serde(default)]
    pub shared_drives_root: Option<Entry>,
    /// Backing container of the computers grouping, when enabled
    #[serde(default)]
    pub computers_root: Option<Entry>,
    /// Virtual entries (offline, shared with me) shown under the volume
    #[serde(default)]
    pub fake_entries: Vec<Entry>,
}

impl VolumeInfo {
    pub fn new(
        volume_id: impl Into<String>,
        volume_type: VolumeType,
        label: impl Into<String>,
    ) -> Self {
        Self {
            volume_id: volume_id.into(),
            volume_type,
            label: label.into(),
            shared_drives_root: None,
            computers_root: None,
            fake_entries: Vec::new(),
        }
    }
}

/// Root type of a location, as reported by the namespace provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootType {
    MyFiles,
    Downloads,
    Drive,
    SharedDrivesGrandRoot,
    SharedDrive,
    ComputersGrandRoot,
    Computer,
    DriveOffline,
    DriveSharedWithMe,
    DriveFakeRoot,
    Removable,
    Archive,
    Provided,
    MediaView,
    Mtp,
    Smb,
    Android,
    Crostini,
    Recent,
    ExternalMedia,
}

impl RootType {
    /// Any part of a cloud drive, including its groupings and virtual roots.
    pub fn is_inside_drive(self) -> bool {
        matches!(
            self,
            Self::Drive
                | Self::SharedDrivesGrandRoot
                | Self::SharedDrive
                | Self::ComputersGrandRoot
                | Self::Computer
                | Self::DriveOffline
                | Self::DriveSharedWithMe
                | Self::DriveFakeRoot
        )
    }

    /// Locations whose folder icons follow shared / machine-root metadata.
    pub fn supports_drive_icons(self) -> bool {
        matches!(
            self,
            Self::Drive | Self::ComputersGrandRoot | Self::Computer
        )
    }
}

/// Where an entry lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub root_type: RootType,
    pub is_root_entry: bool,
    pub volume_id: String,
}
