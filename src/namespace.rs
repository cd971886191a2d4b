//! Namespace provider interface
//!
//! The provider is external: it enumerates directories page by page,
//! resolves URLs, walks to parents and lazily resolves volume display roots.
//! [`read_subdirectories`] is the adapter the tree uses on top of it.

use async_trait::async_trait;

use crate::entry::{Entry, LocationInfo, VolumeInfo};
use crate::error::NamespaceError;

/// Paginated reader over one directory.
#[async_trait]
pub trait DirectoryReader: Send {
    /// Read the next page. An empty page means the listing is exhausted.
    async fn read_entries(&mut self) -> Result<Vec<Entry>, NamespaceError>;
}

/// The external hierarchical namespace (file system) the tree mirrors.
#[async_trait]
pub trait Namespace: Send + Sync {
    /// Open a fresh reader for `dir`. Fails for entries that cannot be listed.
    fn open_reader(&self, dir: &Entry) -> Result<Box<dyn DirectoryReader>, NamespaceError>;

    /// Resolve a URL to a live entry.
    async fn resolve(&self, url: &str) -> Result<Entry, NamespaceError>;

    /// Parent of `entry`. May succeed for entries that no longer exist.
    async fn parent(&self, entry: &Entry) -> Result<Entry, NamespaceError>;

    /// Resolve the root a volume displays. One-shot and not abortable.
    async fn resolve_display_root(&self, volume: &VolumeInfo) -> Result<Entry, NamespaceError>;

    /// Volume owning `entry`, if any.
    fn volume_info(&self, entry: &Entry) -> Option<VolumeInfo>;

    /// Root type of `entry`, if it lives on a known volume.
    fn location_info(&self, entry: &Entry) -> Option<LocationInfo>;
}

/// Drain every page of `dir` and keep only the directories.
///
/// Nothing is cached: each call reads the namespace again.
pub async fn read_subdirectories(
    namespace: &dyn Namespace,
    dir: &Entry,
) -> Result<Vec<Entry>, NamespaceError> {
    let mut reader = namespace.open_reader(dir)?;
    let mut entries = Vec::new();
    loop {
        let page = reader.read_entries().await?;
        if page.is_empty() {
            break;
        }
        entries.extend(page.into_iter().filter(Entry::is_directory));
    }
    Ok(entries)
}
