//! Directory tree reconciliation engine
//!
//! Mirrors a lazily loaded, externally mutated namespace as a tree of
//! view-nodes: children are reconciled in sorted order, cloud volumes group
//! their shared drives and computers, the root list carries section
//! markers, and change notifications refresh the smallest affected subtree.

pub mod entry;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod local;
pub mod metadata;
pub mod namespace;
pub mod navigation;
pub mod node;
pub mod reconcile;
pub mod render;
pub mod roots;
pub mod settings;
pub mod shortcuts;
pub mod sort;
pub mod tree;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use entry::{Entry, EntryKind, LocationInfo, RootType, VolumeInfo, VolumeType};
pub use error::{NamespaceError, StoreError, TreeError, WatchError};
pub use filter::{EntryFilter, VisibilityFilter};
pub use local::LocalNamespace;
pub use metadata::{EntryMetadata, MetadataCache, MetadataUpdate, NoMetadata};
pub use namespace::{read_subdirectories, DirectoryReader, Namespace};
pub use navigation::DirectoryModel;
pub use node::{HasChildren, Icon, IconDescriptor, NodeId, NodeKind, ViewNode};
pub use render::RenderNode;
pub use roots::{RootDescriptor, RootKind, Section};
pub use settings::TreeSettings;
pub use shortcuts::{Shortcut, ShortcutStore};
pub use tree::{
    ChangeEvent, DirectoryTree, EntryChangeKind, PropagationOutcome, RefreshOutcome,
    SelectOutcome,
};
pub use watcher::{pump_changes, start_watching, ChangeWatcher};
