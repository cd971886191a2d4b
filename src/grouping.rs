//! Grouping-node lifecycle
//!
//! A grouped root (cloud drive) shows a synthetic grand root per grouping
//! kind, but only while the grouping's backing container has at least one
//! child. Positions are fixed: the primary root is always first, then the
//! groupings in priority order.

use serde::Serialize;

use crate::entry::{Entry, VolumeInfo};
use crate::node::NodeId;

/// Grouping kinds in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingKind {
    SharedDrives,
    Computers,
}

impl GroupingKind {
    pub const ALL: [GroupingKind; 2] = [GroupingKind::SharedDrives, GroupingKind::Computers];

    /// Backing container of this grouping on `volume`, if enabled.
    pub fn backing_root(self, volume: &VolumeInfo) -> Option<&Entry> {
        match self {
            Self::SharedDrives => volume.shared_drives_root.as_ref(),
            Self::Computers => volume.computers_root.as_ref(),
        }
    }

    /// Grouping that `entry` belongs to on `volume`.
    pub fn containing(volume: &VolumeInfo, entry: &Entry) -> Option<GroupingKind> {
        Self::ALL.into_iter().find(|kind| {
            kind.backing_root(volume)
                .is_some_and(|root| root.contains(entry))
        })
    }

    /// Index a new grouping node goes to, given the groupings already shown.
    pub fn insertion_index(self, present: &[GroupingKind]) -> usize {
        1 + present.iter().filter(|kind| **kind < self).count()
    }
}

/// What to do with a grouping node after reading its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingAction {
    /// Container has children and no node exists yet
    Create { index: usize },
    /// Container has children and the node exists
    Keep { node: NodeId },
    /// Container is empty; drop the node
    Remove { node: NodeId },
    /// Container is empty and there is no node
    Absent,
}

/// Decide the fate of a grouping node. Its existence only depends on
/// whether the container currently has children.
pub fn decide(
    kind: GroupingKind,
    existing: Option<NodeId>,
    child_count: usize,
    present: &[GroupingKind],
) -> GroupingAction {
    match (existing, child_count > 0) {
        (Some(node), true) => GroupingAction::Keep { node },
        (None, true) => GroupingAction::Create {
            index: kind.insertion_index(present),
        },
        (Some(node), false) => GroupingAction::Remove { node },
        (None, false) => GroupingAction::Absent,
    }
}
