//! Local file system namespace
//!
//! Exposes one directory on disk as a single local volume. URLs are
//! `file://` followed by the absolute path.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::entry::{Entry, LocationInfo, RootType, VolumeInfo, VolumeType};
use crate::error::NamespaceError;
use crate::namespace::{DirectoryReader, Namespace};

const FILE_SCHEME: &str = "file://";

/// URL of a local path.
pub fn url_for(path: &Path) -> String {
    format!("{}{}", FILE_SCHEME, path.to_string_lossy())
}

/// Local path of a `file://` URL.
pub fn path_for(url: &str) -> Option<PathBuf> {
    url.strip_prefix(FILE_SCHEME).map(PathBuf::from)
}

pub struct LocalNamespace {
    root: Entry,
    volume: VolumeInfo,
    page_size: usize,
}

impl LocalNamespace {
    pub fn new(root: impl AsRef<Path>, page_size: usize) -> Self {
        let root = root.as_ref();
        let label = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| root.to_string_lossy().to_string());
        Self {
            root: Entry::directory(url_for(root)).named(label.clone()),
            volume: VolumeInfo::new("local", VolumeType::Local, label),
            page_size: page_size.max(1),
        }
    }

    pub fn volume(&self) -> &VolumeInfo {
        &self.volume
    }

    pub fn root(&self) -> &Entry {
        &self.root
    }

    fn owns(&self, entry: &Entry) -> bool {
        self.root.contains(entry)
    }
}

fn map_io(url: &str, err: std::io::Error) -> NamespaceError {
    match err.kind() {
        ErrorKind::NotFound => NamespaceError::NotFound(url.to_string()),
        ErrorKind::PermissionDenied => NamespaceError::NotReadable {
            url: url.to_string(),
            reason: err.to_string(),
        },
        _ => NamespaceError::Io(err),
    }
}

/// Reads one directory `page_size` entries at a time. The directory is
/// opened on the first read.
struct LocalReader {
    path: PathBuf,
    url: String,
    page_size: usize,
    dir: Option<tokio::fs::ReadDir>,
    done: bool,
}

#[async_trait]
impl DirectoryReader for LocalReader {
    async fn read_entries(&mut self) -> Result<Vec<Entry>, NamespaceError> {
        if self.done {
            return Ok(Vec::new());
        }
        if self.dir.is_none() {
            let dir = tokio::fs::read_dir(&self.path)
                .await
                .map_err(|e| map_io(&self.url, e))?;
            self.dir = Some(dir);
        }
        let Some(dir) = self.dir.as_mut() else {
            return Ok(Vec::new());
        };

        let mut page = Vec::with_capacity(self.page_size);
        while page.len() < self.page_size {
            let Some(item) = dir.next_entry().await.map_err(|e| map_io(&self.url, e))? else {
                self.done = true;
                break;
            };
            let path = item.path();
            // Follow symlinks; dangling ones are skipped.
            let is_dir = match item.file_type().await {
                Ok(ft) if ft.is_symlink() => match tokio::fs::metadata(&path).await {
                    Ok(meta) => meta.is_dir(),
                    Err(_) => continue,
                },
                Ok(ft) => ft.is_dir(),
                Err(e) => {
                    tracing::trace!("[Local] Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            let url = url_for(&path);
            page.push(if is_dir {
                Entry::directory(url)
            } else {
                Entry::file(url)
            });
        }
        Ok(page)
    }
}

#[async_trait]
impl Namespace for LocalNamespace {
    fn open_reader(&self, dir: &Entry) -> Result<Box<dyn DirectoryReader>, NamespaceError> {
        let path = path_for(dir.url()).ok_or_else(|| NamespaceError::NotFound(dir.url().to_string()))?;
        if !dir.is_directory() {
            return Err(NamespaceError::NotReadable {
                url: dir.url().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Box::new(LocalReader {
            path,
            url: dir.url().to_string(),
            page_size: self.page_size,
            dir: None,
            done: false,
        }))
    }

    async fn resolve(&self, url: &str) -> Result<Entry, NamespaceError> {
        let path = path_for(url).ok_or_else(|| NamespaceError::NotFound(url.to_string()))?;
        let meta = tokio::fs::metadata(&path).await.map_err(|e| map_io(url, e))?;
        let entry = if meta.is_dir() {
            Entry::directory(url)
        } else {
            Entry::file(url)
        };
        if entry == self.root {
            return Ok(self.root.clone());
        }
        Ok(entry)
    }

    async fn parent(&self, entry: &Entry) -> Result<Entry, NamespaceError> {
        if !entry.is_descendant_of(&self.root) {
            return Err(NamespaceError::NotFound(format!("parent of {}", entry.url())));
        }
        match entry.parent_url() {
            Some(url) if url == self.root.url() => Ok(self.root.clone()),
            Some(url) => Ok(Entry::directory(url)),
            None => Err(NamespaceError::NotFound(format!("parent of {}", entry.url()))),
        }
    }

    async fn resolve_display_root(&self, volume: &VolumeInfo) -> Result<Entry, NamespaceError> {
        if volume.volume_id != self.volume.volume_id {
            return Err(NamespaceError::NotFound(volume.volume_id.clone()));
        }
        let path = path_for(self.root.url())
            .ok_or_else(|| NamespaceError::NotFound(self.root.url().to_string()))?;
        tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(self.root.url(), e))?;
        Ok(self.root.clone())
    }

    fn volume_info(&self, entry: &Entry) -> Option<VolumeInfo> {
        self.owns(entry).then(|| self.volume.clone())
    }

    fn location_info(&self, entry: &Entry) -> Option<LocationInfo> {
        self.owns(entry).then(|| LocationInfo {
            root_type: RootType::MyFiles,
            is_root_entry: *entry == self.root,
            volume_id: self.volume.volume_id.clone(),
        })
    }
}
