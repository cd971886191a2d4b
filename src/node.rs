//! View-node variants
//!
//! Every row of the tree is a [`ViewNode`]. Behavior that differs per kind
//! (how children are fetched and sorted, what activation does, whether the
//! node can be selected itself) is decided by [`NodeKind`].

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::entry::{Entry, LocationInfo, RootType, VolumeInfo, VolumeType};
use crate::grouping::GroupingKind;
use crate::metadata::EntryMetadata;
use crate::roots::{RootDescriptor, Section};
use crate::sort::SortPolicy;

/// Stable handle of a view-node inside one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a node has children, as far as the tree knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HasChildren {
    /// Never read; the expander is shown
    Unknown,
    Yes,
    No,
}

/// Per-kind behavior
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Plain directory below a root
    Directory,
    /// Root of a mounted volume; its entry is resolved lazily
    Volume { volume: VolumeInfo },
    /// Cloud drive root holding a primary root plus grouping roots
    GroupedVolume { volume: VolumeInfo },
    /// Pinned folder, never has children
    Shortcut,
    /// Virtual root (recent, linux files), never has children
    Fake { root_type: RootType },
    /// Several physical roots merged under one umbrella
    EntryList {
        root_type: RootType,
        ui_children: HashSet<String>,
    },
}

impl NodeKind {
    pub fn sort_policy(&self) -> SortPolicy {
        match self {
            Self::EntryList { ui_children, .. } => SortPolicy::GroupBottom(ui_children.clone()),
            _ => SortPolicy::Name,
        }
    }

    /// Grouped roots build their own fixed child list.
    pub fn supports_grouping(&self) -> bool {
        matches!(self, Self::GroupedVolume { .. })
    }

    pub fn can_have_children(&self) -> bool {
        match self {
            Self::Shortcut | Self::Fake { .. } => false,
            Self::Volume { volume } => volume.volume_type.shows_subdirectories(),
            _ => true,
        }
    }

    /// Volume roots are refreshed when the root list is redrawn recursively
    /// and receive change notifications.
    pub fn is_volume_root(&self) -> bool {
        matches!(self, Self::Volume { .. } | Self::GroupedVolume { .. })
    }

    pub fn volume(&self) -> Option<&VolumeInfo> {
        match self {
            Self::Volume { volume } | Self::GroupedVolume { volume } => Some(volume),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Volume { .. } => "volume",
            Self::GroupedVolume { .. } => "grouped-volume",
            Self::Shortcut => "shortcut",
            Self::Fake { .. } => "fake",
            Self::EntryList { .. } => "entry-list",
        }
    }
}

/// Icon family of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Icon {
    Folder,
    Root(RootType),
    Volume(VolumeType),
    Shortcut,
}

/// What the renderer needs to draw an icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconDescriptor {
    pub icon: Icon,
    pub shared: bool,
}

impl IconDescriptor {
    pub fn plain(icon: Icon) -> Self {
        Self {
            icon,
            shared: false,
        }
    }

    /// Icon of a directory row, from its location and cached metadata.
    pub fn for_directory(
        entry: &Entry,
        location: Option<&LocationInfo>,
        metadata: EntryMetadata,
    ) -> Self {
        if let Some(location) = location {
            if location.is_root_entry {
                return Self::plain(Icon::Root(location.root_type));
            }
        }

        let mut icon = match location.and_then(|l| icon_override(l.root_type, entry)) {
            Some(root_type) => Icon::Root(root_type),
            None => Icon::Folder,
        };
        if metadata.is_machine_root {
            icon = Icon::Root(RootType::Computer);
        }
        if metadata.is_external_media {
            icon = Icon::Root(RootType::ExternalMedia);
        }
        Self {
            icon,
            shared: metadata.shared,
        }
    }
}

/// Per-root icon overrides keyed by full path.
fn icon_override(root_type: RootType, entry: &Entry) -> Option<RootType> {
    match (root_type, entry.full_path()) {
        (RootType::Downloads | RootType::MyFiles, "/Downloads") => Some(RootType::Downloads),
        _ => None,
    }
}

/// Display label of an entry.
pub fn entry_label(location: Option<&LocationInfo>, entry: &Entry) -> String {
    if let Some(location) = location.filter(|l| l.is_root_entry) {
        let label = match location.root_type {
            RootType::Drive => Some("My Drive"),
            RootType::SharedDrivesGrandRoot => Some("Shared drives"),
            RootType::ComputersGrandRoot => Some("Computers"),
            RootType::DriveOffline => Some("Offline"),
            RootType::DriveSharedWithMe => Some("Shared with me"),
            RootType::Downloads => Some("Downloads"),
            RootType::MyFiles => Some("My files"),
            _ => None,
        };
        if let Some(label) = label {
            return label.to_string();
        }
    }
    entry.name().to_string()
}

/// One row of the tree
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    /// Backing entry; `None` for volume roots until their root resolves
    pub(crate) entry: Option<Entry>,
    pub(crate) label: String,
    pub(crate) icon: IconDescriptor,
    pub(crate) children: Vec<NodeId>,
    pub(crate) expanded: bool,
    pub(crate) has_children: HasChildren,
    /// Fixed at creation, inherited from the parent
    pub(crate) delay_expansion: bool,
    /// A read is in flight; refreshes are refused until it lands
    pub(crate) loading: bool,
    pub(crate) section_start: Option<Section>,
    /// Set when this node holds a metadata listener
    pub(crate) listening: bool,
    pub(crate) grouping: Option<GroupingKind>,
    /// Top-level nodes remember the descriptor they were built from
    pub(crate) descriptor: Option<RootDescriptor>,
}

impl ViewNode {
    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, kind: NodeKind, label: String) -> Self {
        Self {
            id,
            parent,
            kind,
            entry: None,
            label,
            icon: IconDescriptor::plain(Icon::Folder),
            children: Vec::new(),
            expanded: false,
            has_children: HasChildren::Unknown,
            delay_expansion: false,
            loading: false,
            section_start: None,
            listening: false,
            grouping: None,
            descriptor: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn icon(&self) -> IconDescriptor {
        self.icon
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn has_children(&self) -> HasChildren {
        self.has_children
    }

    pub fn delay_expansion(&self) -> bool {
        self.delay_expansion
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn section_start(&self) -> Option<Section> {
        self.section_start
    }

    pub fn grouping(&self) -> Option<GroupingKind> {
        self.grouping
    }

    pub fn descriptor(&self) -> Option<&RootDescriptor> {
        self.descriptor.as_ref()
    }

    /// True when `entry` is this node's entry.
    pub(crate) fn shows(&self, entry: &Entry) -> bool {
        self.entry.as_ref() == Some(entry)
    }

    /// True when `entry` is this node's entry or lies below it.
    pub(crate) fn covers(&self, entry: &Entry) -> bool {
        self.entry.as_ref().is_some_and(|own| own.contains(entry))
    }
}
