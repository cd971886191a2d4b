//! Root descriptors
//!
//! The ordered list of top-level roots is owned outside the tree. Each
//! descriptor carries the section it belongs to; a marker is drawn above
//! the first root of every section except the very first one.

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, RootType, VolumeInfo};

/// Navigation-list section a root belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Top,
    MyFiles,
    Removable,
    Cloud,
    Android,
}

/// What a top-level root points at. Unknown kinds fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RootKind {
    Volume {
        volume: VolumeInfo,
    },
    Shortcut {
        entry: Entry,
    },
    Fake {
        root_type: RootType,
        entry: Entry,
    },
    EntryList {
        root_type: RootType,
        entry: Entry,
        /// URLs grouped at the bottom of the list
        #[serde(default)]
        ui_children: Vec<String>,
    },
}

/// One entry of the externally owned root list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootDescriptor {
    pub label: String,
    pub section: Section,
    #[serde(flatten)]
    pub kind: RootKind,
}

impl RootDescriptor {
    pub fn volume(volume: VolumeInfo, section: Section) -> Self {
        Self {
            label: volume.label.clone(),
            section,
            kind: RootKind::Volume { volume },
        }
    }

    pub fn shortcut(entry: Entry, section: Section) -> Self {
        Self {
            label: entry.name().to_string(),
            section,
            kind: RootKind::Shortcut { entry },
        }
    }

    pub fn fake(root_type: RootType, entry: Entry, section: Section) -> Self {
        Self {
            label: entry.name().to_string(),
            section,
            kind: RootKind::Fake { root_type, entry },
        }
    }

    pub fn entry_list(
        root_type: RootType,
        entry: Entry,
        ui_children: Vec<String>,
        section: Section,
    ) -> Self {
        Self {
            label: entry.name().to_string(),
            section,
            kind: RootKind::EntryList {
                root_type,
                entry,
                ui_children,
            },
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Identity used to match a descriptor with an existing top-level node.
    pub fn key(&self) -> String {
        match &self.kind {
            RootKind::Volume { volume } => format!("volume:{}", volume.volume_id),
            RootKind::Shortcut { entry } => format!("shortcut:{}", entry.url()),
            RootKind::Fake { entry, .. } => format!("fake:{}", entry.url()),
            RootKind::EntryList { entry, .. } => format!("entry-list:{}", entry.url()),
        }
    }
}

/// Section marker for each descriptor, in order.
pub fn section_markers(descriptors: &[RootDescriptor]) -> Vec<Option<Section>> {
    let mut previous = descriptors.first().map(|d| d.section);
    descriptors
        .iter()
        .map(|descriptor| {
            let marker = (Some(descriptor.section) != previous).then_some(descriptor.section);
            previous = Some(descriptor.section);
            marker
        })
        .collect()
}
