//! Metadata cache interface
//!
//! The cache is shared and owned elsewhere. The tree only reads cached
//! values to decorate folder icons, and keeps a listener registered for as
//! long as a metadata-sensitive node stays expanded.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::entry::Entry;
use crate::node::NodeId;

pub const SHARED: &str = "shared";
pub const IS_MACHINE_ROOT: &str = "isMachineRoot";
pub const IS_EXTERNAL_MEDIA: &str = "isExternalMedia";

/// Properties that change a folder icon.
pub const ICON_PROPERTY_NAMES: [&str; 3] = [SHARED, IS_MACHINE_ROOT, IS_EXTERNAL_MEDIA];

/// Properties prefetched for children of an expanded drive folder.
pub const CONTAINER_PREFETCH_PROPERTY_NAMES: [&str; 4] =
    [SHARED, IS_MACHINE_ROOT, IS_EXTERNAL_MEDIA, "canShare"];

/// Icon-relevant metadata of one entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub shared: bool,
    pub is_machine_root: bool,
    pub is_external_media: bool,
}

/// Notification that some properties of some entries changed
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    /// URLs of the affected entries
    pub urls: HashSet<String>,
    /// Names of the changed properties
    pub names: HashSet<String>,
}

impl MetadataUpdate {
    pub fn new<'a>(
        urls: impl IntoIterator<Item = &'a str>,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            urls: urls.into_iter().map(str::to_string).collect(),
            names: names.into_iter().map(str::to_string).collect(),
        }
    }

    /// True when at least one icon property changed.
    pub fn touches_icons(&self) -> bool {
        ICON_PROPERTY_NAMES.iter().any(|name| self.names.contains(*name))
    }
}

#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Cached values only, one per entry, in order. Never fetches.
    fn get_cached(&self, entries: &[Entry], names: &[&str]) -> Vec<EntryMetadata>;

    /// Fetch and cache properties for `entries`.
    async fn prefetch(&self, entries: &[Entry], names: &[&str]);

    /// Start delivering updates on behalf of `listener`.
    fn subscribe(&self, listener: NodeId);

    /// Stop delivering updates on behalf of `listener`.
    fn unsubscribe(&self, listener: NodeId);
}

/// Cache that knows nothing and never notifies.
#[derive(Debug, Default)]
pub struct NoMetadata;

#[async_trait]
impl MetadataCache for NoMetadata {
    fn get_cached(&self, entries: &[Entry], _names: &[&str]) -> Vec<EntryMetadata> {
        vec![EntryMetadata::default(); entries.len()]
    }

    async fn prefetch(&self, _entries: &[Entry], _names: &[&str]) {}

    fn subscribe(&self, _listener: NodeId) {}

    fn unsubscribe(&self, _listener: NodeId) {}
}
