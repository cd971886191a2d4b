//! In-memory fixtures for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::entry::{Entry, LocationInfo, RootType, VolumeInfo, VolumeType};
use crate::error::NamespaceError;
use crate::metadata::{EntryMetadata, MetadataCache};
use crate::namespace::{DirectoryReader, Namespace};
use crate::navigation::DirectoryModel;
use crate::node::NodeId;
use crate::roots::RootDescriptor;

/// Namespace backed by maps. URLs look like `mem://<volume_id>/path`.
/// Listings come back in insertion order so sorting is observable.
#[derive(Clone, Default)]
pub struct MemoryNamespace {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    volumes: Vec<(VolumeInfo, Entry)>,
    entries: HashMap<String, Entry>,
    children: HashMap<String, Vec<String>>,
    unreadable: HashSet<String>,
    page_size: Option<usize>,
    reads: HashMap<String, usize>,
    read_delays: HashMap<String, Duration>,
    pages: HashMap<String, usize>,
    resolve_delays: HashMap<String, Duration>,
    resolve_failures: HashSet<String>,
    resolves: HashMap<String, usize>,
}

impl MemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page_size(&self, size: usize) {
        self.inner.lock().page_size = Some(size.max(1));
    }

    /// Register a volume whose display root is `root_url`.
    pub fn add_volume(&self, volume: VolumeInfo, root_url: &str) {
        let root = Entry::directory(root_url).named(volume.label.clone());
        self.inner.lock().volumes.push((volume, root.clone()));
        self.insert(root);
    }

    pub fn add_local_volume(&self, volume_id: &str) -> VolumeInfo {
        let volume = VolumeInfo::new(volume_id, VolumeType::Local, volume_id);
        self.add_volume(volume.clone(), &format!("mem://{}", volume_id));
        volume
    }

    /// Cloud drive with both grouping containers (empty) and one fake entry.
    pub fn add_drive_volume(&self) -> VolumeInfo {
        let mut volume = VolumeInfo::new("drive", VolumeType::Drive, "Google Drive");
        volume.shared_drives_root = Some(Entry::directory("mem://drive/team_drives"));
        volume.computers_root = Some(Entry::directory("mem://drive/Computers"));
        volume.fake_entries = vec![Entry::directory("fake://drive_offline").named("Offline")];
        self.add_volume(volume.clone(), "mem://drive/root");
        self.add_dir("mem://drive/team_drives");
        self.add_dir("mem://drive/Computers");
        volume
    }

    pub fn add_dir(&self, url: &str) -> Entry {
        let entry = Entry::directory(url);
        self.insert(entry.clone());
        entry
    }

    pub fn add_file(&self, url: &str) -> Entry {
        let entry = Entry::file(url);
        self.insert(entry.clone());
        entry
    }

    fn insert(&self, entry: Entry) {
        let mut inner = self.inner.lock();
        if let Some(parent) = entry.parent_url() {
            let siblings = inner.children.entry(parent).or_default();
            if !siblings.iter().any(|u| u == entry.url()) {
                siblings.push(entry.url().to_string());
            }
        }
        inner.entries.insert(entry.url().to_string(), entry);
    }

    /// Delete `url` and everything below it.
    pub fn remove(&self, url: &str) {
        let mut inner = self.inner.lock();
        let mut doomed = vec![url.to_string()];
        let mut i = 0;
        while i < doomed.len() {
            if let Some(children) = inner.children.remove(&doomed[i]) {
                doomed.extend(children);
            }
            i += 1;
        }
        for gone in &doomed {
            inner.entries.remove(gone);
        }
        if let Some(parent) = Entry::directory(url).parent_url() {
            if let Some(siblings) = inner.children.get_mut(&parent) {
                siblings.retain(|u| u != url);
            }
        }
    }

    pub fn set_unreadable(&self, url: &str) {
        self.inner.lock().unreadable.insert(url.to_string());
    }

    /// Hold the first page of every read of `url` back for `delay`.
    pub fn set_read_delay(&self, url: &str, delay: Duration) {
        let mut inner = self.inner.lock();
        if delay.is_zero() {
            inner.read_delays.remove(url);
        } else {
            inner.read_delays.insert(url.to_string(), delay);
        }
    }

    pub fn set_resolve_delay(&self, volume_id: &str, delay: Duration) {
        self.inner
            .lock()
            .resolve_delays
            .insert(volume_id.to_string(), delay);
    }

    pub fn set_resolve_failure(&self, volume_id: &str, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.resolve_failures.insert(volume_id.to_string());
        } else {
            inner.resolve_failures.remove(volume_id);
        }
    }

    /// Number of readers opened on `url`.
    pub fn read_count(&self, url: &str) -> usize {
        self.inner.lock().reads.get(url).copied().unwrap_or(0)
    }

    pub fn pages_served(&self, url: &str) -> usize {
        self.inner.lock().pages.get(url).copied().unwrap_or(0)
    }

    pub fn resolve_count(&self, volume_id: &str) -> usize {
        self.inner.lock().resolves.get(volume_id).copied().unwrap_or(0)
    }

    pub fn reset_counts(&self) {
        let mut inner = self.inner.lock();
        inner.reads.clear();
        inner.pages.clear();
        inner.resolves.clear();
    }

    fn volume_of(&self, entry: &Entry) -> Option<(VolumeInfo, Entry)> {
        let authority = entry.url().split("://").nth(1)?.split('/').next()?;
        self.inner
            .lock()
            .volumes
            .iter()
            .find(|(v, _)| v.volume_id == authority)
            .cloned()
    }
}

struct MemoryReader {
    inner: Arc<Mutex<Inner>>,
    url: String,
    remaining: Vec<Entry>,
    page_size: usize,
    delay: Option<Duration>,
}

#[async_trait]
impl DirectoryReader for MemoryReader {
    async fn read_entries(&mut self) -> Result<Vec<Entry>, NamespaceError> {
        if let Some(delay) = self.delay.take() {
            tokio::time::sleep(delay).await;
        }
        let take = self.page_size.min(self.remaining.len());
        let page: Vec<Entry> = self.remaining.drain(..take).collect();
        if !page.is_empty() {
            *self.inner.lock().pages.entry(self.url.clone()).or_default() += 1;
        }
        Ok(page)
    }
}

#[async_trait]
impl Namespace for MemoryNamespace {
    fn open_reader(&self, dir: &Entry) -> Result<Box<dyn DirectoryReader>, NamespaceError> {
        let mut inner = self.inner.lock();
        *inner.reads.entry(dir.url().to_string()).or_default() += 1;
        if inner.unreadable.contains(dir.url()) {
            return Err(NamespaceError::NotReadable {
                url: dir.url().to_string(),
                reason: "permission denied".to_string(),
            });
        }
        if !inner.entries.contains_key(dir.url()) {
            return Err(NamespaceError::NotFound(dir.url().to_string()));
        }
        let remaining = inner
            .children
            .get(dir.url())
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| inner.entries.get(u).cloned())
                    .collect()
            })
            .unwrap_or_default();
        let page_size = inner.page_size.unwrap_or(usize::MAX);
        Ok(Box::new(MemoryReader {
            inner: self.inner.clone(),
            url: dir.url().to_string(),
            remaining,
            page_size,
            delay: inner.read_delays.get(dir.url()).copied(),
        }))
    }

    async fn resolve(&self, url: &str) -> Result<Entry, NamespaceError> {
        self.inner
            .lock()
            .entries
            .get(url)
            .cloned()
            .ok_or_else(|| NamespaceError::NotFound(url.to_string()))
    }

    async fn parent(&self, entry: &Entry) -> Result<Entry, NamespaceError> {
        let is_volume_root = self
            .volume_of(entry)
            .is_some_and(|(_, root)| root == *entry || root.is_descendant_of(entry));
        match entry.parent_url() {
            Some(parent) if !is_volume_root => Ok(Entry::directory(parent)),
            _ => Err(NamespaceError::NotFound(format!("parent of {}", entry.url()))),
        }
    }

    async fn resolve_display_root(&self, volume: &VolumeInfo) -> Result<Entry, NamespaceError> {
        let (delay, fails, root) = {
            let mut inner = self.inner.lock();
            *inner.resolves.entry(volume.volume_id.clone()).or_default() += 1;
            (
                inner.resolve_delays.get(&volume.volume_id).copied(),
                inner.resolve_failures.contains(&volume.volume_id),
                inner
                    .volumes
                    .iter()
                    .find(|(v, _)| v.volume_id == volume.volume_id)
                    .map(|(_, root)| root.clone()),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fails {
            return Err(NamespaceError::NotFound(volume.volume_id.clone()));
        }
        root.ok_or_else(|| NamespaceError::NotFound(volume.volume_id.clone()))
    }

    fn volume_info(&self, entry: &Entry) -> Option<VolumeInfo> {
        self.volume_of(entry).map(|(volume, _)| volume)
    }

    fn location_info(&self, entry: &Entry) -> Option<LocationInfo> {
        let (volume, root) = self.volume_of(entry)?;
        let path = entry.full_path();
        let (root_type, is_root_entry) = match volume.volume_type {
            VolumeType::Drive => {
                let top = path.split('/').find(|s| !s.is_empty()).unwrap_or_default();
                let is_top = entry.depth() == 1;
                match top {
                    "root" => (RootType::Drive, is_top),
                    "team_drives" if is_top => (RootType::SharedDrivesGrandRoot, true),
                    "team_drives" => (RootType::SharedDrive, entry.depth() == 2),
                    "Computers" if is_top => (RootType::ComputersGrandRoot, true),
                    "Computers" => (RootType::Computer, entry.depth() == 2),
                    _ => (RootType::DriveFakeRoot, is_top),
                }
            }
            other => {
                let root_type = match other {
                    VolumeType::Local => RootType::MyFiles,
                    VolumeType::Removable => RootType::Removable,
                    VolumeType::Archive => RootType::Archive,
                    VolumeType::Provided => RootType::Provided,
                    VolumeType::MediaView => RootType::MediaView,
                    VolumeType::Mtp => RootType::Mtp,
                    VolumeType::Smb => RootType::Smb,
                    VolumeType::Android => RootType::Android,
                    VolumeType::Crostini => RootType::Crostini,
                    VolumeType::Drive => RootType::Drive,
                };
                (root_type, *entry == root)
            }
        };
        Some(LocationInfo {
            root_type,
            is_root_entry,
            volume_id: volume.volume_id,
        })
    }
}

/// Directory model that records every call.
#[derive(Default)]
pub struct RecordingModel {
    current: Mutex<Option<Entry>>,
    pub changed: Mutex<Vec<String>>,
    pub activated: Mutex<Vec<String>>,
    pub not_found: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn set_current(&self, entry: Option<Entry>) {
        *self.current.lock() = entry;
    }
}

impl DirectoryModel for RecordingModel {
    fn current_directory(&self) -> Option<Entry> {
        self.current.lock().clone()
    }

    fn change_directory(&self, entry: &Entry) {
        self.changed.lock().push(entry.url().to_string());
        *self.current.lock() = Some(entry.clone());
    }

    fn activate_directory(&self, entry: &Entry) {
        self.activated.lock().push(entry.url().to_string());
    }

    fn on_item_not_found(&self, root: &RootDescriptor) {
        self.not_found.lock().push(root.label.clone());
    }
}

/// Metadata cache with settable values and a visible subscriber set.
#[derive(Default)]
pub struct MemoryMetadata {
    values: Mutex<HashMap<String, EntryMetadata>>,
    pub subscribers: Mutex<HashSet<NodeId>>,
    pub prefetches: Mutex<usize>,
}

impl MemoryMetadata {
    pub fn set(&self, url: &str, metadata: EntryMetadata) {
        self.values.lock().insert(url.to_string(), metadata);
    }

    pub fn is_subscribed(&self, id: NodeId) -> bool {
        self.subscribers.lock().contains(&id)
    }
}

#[async_trait]
impl MetadataCache for MemoryMetadata {
    fn get_cached(&self, entries: &[Entry], _names: &[&str]) -> Vec<EntryMetadata> {
        let values = self.values.lock();
        entries
            .iter()
            .map(|e| values.get(e.url()).copied().unwrap_or_default())
            .collect()
    }

    async fn prefetch(&self, _entries: &[Entry], _names: &[&str]) {
        *self.prefetches.lock() += 1;
    }

    fn subscribe(&self, listener: NodeId) {
        self.subscribers.lock().insert(listener);
    }

    fn unsubscribe(&self, listener: NodeId) {
        self.subscribers.lock().remove(&listener);
    }
}
