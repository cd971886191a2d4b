//! Synchronous node store behind the tree mutex.
//!
//! Nothing here awaits. Listener (un)registrations are queued and flushed by
//! the tree once the lock is released.

use std::collections::{HashMap, HashSet};

use crate::entry::{Entry, RootType, VolumeType};
use crate::grouping::GroupingKind;
use crate::node::{HasChildren, Icon, IconDescriptor, NodeId, NodeKind, ViewNode};
use crate::roots::{RootDescriptor, RootKind};

/// Deferred call into the metadata cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenerCall {
    Subscribe(NodeId),
    Unsubscribe(NodeId),
}

/// Label and icon computed for an entry before it is applied
#[derive(Debug, Clone)]
pub(crate) struct Decoration {
    pub label: String,
    pub icon: IconDescriptor,
}

impl Decoration {
    /// Name label with a folder icon.
    pub fn plain(entry: &Entry) -> Self {
        Self {
            label: entry.name().to_string(),
            icon: IconDescriptor::plain(Icon::Folder),
        }
    }
}

#[derive(Default)]
pub(crate) struct TreeState {
    nodes: HashMap<NodeId, ViewNode>,
    pub(crate) top: Vec<NodeId>,
    pub(crate) selected: Option<NodeId>,
    pub(crate) descriptors: Vec<RootDescriptor>,
    next_id: u64,
    pending: Vec<ListenerCall>,
}

impl TreeState {
    pub(crate) fn node(&self, id: NodeId) -> Option<&ViewNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.nodes.get_mut(&id)
    }

    /// Children of `parent`, or the top-level list for `None`.
    pub(crate) fn child_ids(&self, parent: Option<NodeId>) -> Vec<NodeId> {
        match parent {
            Some(id) => self
                .nodes
                .get(&id)
                .map(|n| n.children.clone())
                .unwrap_or_default(),
            None => self.top.clone(),
        }
    }

    fn alloc(&mut self, parent: Option<NodeId>, kind: NodeKind, label: String) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, ViewNode::new(id, parent, kind, label));
        id
    }

    /// Create a directory node below `parent`. The caller links it into the
    /// parent's child list.
    pub(crate) fn add_directory(
        &mut self,
        parent: NodeId,
        entry: Entry,
        decoration: Decoration,
        grouping: Option<GroupingKind>,
    ) -> NodeId {
        let delay = self.nodes.get(&parent).is_some_and(|p| p.delay_expansion);
        let id = self.alloc(Some(parent), NodeKind::Directory, decoration.label);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.entry = Some(entry);
            node.icon = decoration.icon;
            node.grouping = grouping;
            node.delay_expansion = delay;
            if delay {
                node.has_children = HasChildren::Yes;
            }
        }
        id
    }

    /// Create a virtual child of a grouped root.
    pub(crate) fn add_fake(
        &mut self,
        parent: NodeId,
        entry: Entry,
        root_type: RootType,
        decoration: Decoration,
    ) -> NodeId {
        let id = self.alloc(Some(parent), NodeKind::Fake { root_type }, decoration.label);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.entry = Some(entry);
            node.icon = IconDescriptor::plain(Icon::Root(root_type));
            node.has_children = HasChildren::No;
        }
        id
    }

    /// Create a top-level node for `descriptor`. The caller links it.
    pub(crate) fn add_root(&mut self, descriptor: &RootDescriptor) -> NodeId {
        let label = descriptor.label.clone();
        let (kind, entry, icon) = match &descriptor.kind {
            RootKind::Volume { volume } => {
                let icon = Icon::Volume(volume.volume_type);
                let kind = if volume.volume_type == VolumeType::Drive {
                    NodeKind::GroupedVolume {
                        volume: volume.clone(),
                    }
                } else {
                    NodeKind::Volume {
                        volume: volume.clone(),
                    }
                };
                (kind, None, icon)
            }
            RootKind::Shortcut { entry } => (NodeKind::Shortcut, Some(entry.clone()), Icon::Shortcut),
            RootKind::Fake { root_type, entry } => (
                NodeKind::Fake {
                    root_type: *root_type,
                },
                Some(entry.clone()),
                Icon::Root(*root_type),
            ),
            RootKind::EntryList {
                root_type,
                entry,
                ui_children,
            } => (
                NodeKind::EntryList {
                    root_type: *root_type,
                    ui_children: ui_children.iter().cloned().collect(),
                },
                Some(entry.clone()),
                Icon::Root(*root_type),
            ),
        };

        let id = self.alloc(None, kind, label);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.entry = entry;
            node.icon = IconDescriptor::plain(icon);
            node.descriptor = Some(descriptor.clone());
            node.delay_expansion = node
                .kind
                .volume()
                .is_some_and(|v| v.volume_type.is_high_latency());
            if !node.kind.can_have_children() {
                node.has_children = HasChildren::No;
            }
        }
        id
    }

    /// Drop `id` and everything below it. Selection is cleared first when it
    /// points into the subtree. The caller unlinks `id` from its parent.
    pub(crate) fn drop_subtree(&mut self, id: NodeId) -> usize {
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            if let Some(node) = self.nodes.get(&doomed[i]) {
                doomed.extend(node.children.iter().copied());
            }
            i += 1;
        }

        if self.selected.is_some_and(|s| doomed.contains(&s)) {
            self.selected = None;
        }
        for gone in &doomed {
            if let Some(node) = self.nodes.remove(gone) {
                if node.listening {
                    self.pending.push(ListenerCall::Unsubscribe(*gone));
                }
            }
        }
        doomed.len()
    }

    pub(crate) fn subscribe(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if !node.listening {
                node.listening = true;
                self.pending.push(ListenerCall::Subscribe(id));
            }
        }
    }

    pub(crate) fn unsubscribe(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            if node.listening {
                node.listening = false;
                self.pending.push(ListenerCall::Unsubscribe(id));
            }
        }
    }

    /// Collapse `id`. Delayed nodes also collapse their expanded children,
    /// which cascades.
    pub(crate) fn collapse(&mut self, id: NodeId) {
        let (delay, children) = match self.nodes.get_mut(&id) {
            Some(node) => {
                node.expanded = false;
                (node.delay_expansion, node.children.clone())
            }
            None => return,
        };
        self.unsubscribe(id);

        if delay {
            for child in children {
                if self.nodes.get(&child).is_some_and(|c| c.expanded) {
                    self.collapse(child);
                }
            }
        }
    }

    pub(crate) fn take_pending(&mut self) -> Vec<ListenerCall> {
        std::mem::take(&mut self.pending)
    }

    /// Mark `id` selected, clearing the previous selection first, and make
    /// sure every ancestor is expanded so the row is visible.
    /// Returns the ancestors that were collapsed and are now expanded.
    pub(crate) fn select(&mut self, id: NodeId) -> Vec<(NodeId, Entry)> {
        self.selected = Some(id);

        let mut revealed = Vec::new();
        let mut cursor = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(ancestor) = cursor {
            match self.nodes.get_mut(&ancestor) {
                Some(node) => {
                    if !node.expanded {
                        node.expanded = true;
                        if let Some(entry) = &node.entry {
                            revealed.push((ancestor, entry.clone()));
                        }
                    }
                    cursor = node.parent;
                }
                None => break,
            }
        }
        revealed
    }

    /// First node showing `entry`, depth first in display order.
    pub(crate) fn find_by_entry(&self, entry: &Entry) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.top.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if node.shows(entry) && !node.kind.supports_grouping() {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Child of `parent` to hand the search for `entry` to: an exact match
    /// first, then a node whose subtree may contain it.
    pub(crate) fn search_candidate(&self, parent: Option<NodeId>, entry: &Entry) -> Option<NodeId> {
        let ids = self.child_ids(parent);
        let nodes: Vec<&ViewNode> = ids.iter().filter_map(|id| self.nodes.get(id)).collect();

        if let Some(exact) = nodes
            .iter()
            .find(|n| n.shows(entry) && !n.kind.supports_grouping())
        {
            return Some(exact.id);
        }

        nodes
            .iter()
            .filter(|n| n.kind.can_have_children())
            .find(|n| match &n.kind {
                NodeKind::GroupedVolume { volume } => {
                    n.covers(entry) || GroupingKind::containing(volume, entry).is_some()
                }
                _ => n.covers(entry),
            })
            .map(|n| n.id)
    }

    /// Listening nodes' children whose URL is in `urls`.
    pub(crate) fn listening_children(&self, urls: &HashSet<String>) -> Vec<(NodeId, Entry)> {
        self.nodes
            .values()
            .filter(|n| n.listening)
            .flat_map(|n| n.children.iter())
            .filter_map(|child| {
                let node = self.nodes.get(child)?;
                let entry = node.entry.as_ref()?;
                urls.contains(entry.url()).then(|| (*child, entry.clone()))
            })
            .collect()
    }
}
