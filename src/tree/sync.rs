//! Root-list synchronization.

use futures::future::join_all;
use std::collections::HashSet;

use super::DirectoryTree;
use crate::node::{NodeId, NodeKind};
use crate::roots::{section_markers, RootDescriptor};

impl DirectoryTree {
    /// Replace the root list and redraw the top level. When nothing ends up
    /// selected, the current directory is selected again.
    pub async fn set_root_descriptors(&self, descriptors: Vec<RootDescriptor>) {
        tracing::debug!("[Tree] Root list changed ({} roots)", descriptors.len());
        self.state.lock().descriptors = descriptors;
        self.update_roots(false).await;

        if self.selected().is_none() {
            if let Some(current) = self.model.current_directory() {
                if let Err(err) = self.select_by_entry(&current).await {
                    tracing::debug!("[Tree] Cannot reselect {}: {}", current.url(), err);
                }
            }
        }
    }

    /// Bring the top level in line with the root descriptors.
    ///
    /// Nodes whose descriptor disappeared are removed, matching nodes are
    /// kept in place (and refreshed recursively when `recursive`), new
    /// nodes are inserted at their index. Entry lists are always redrawn
    /// since the volumes they merge may have changed.
    pub async fn update_roots(&self, recursive: bool) {
        let (resolve, follow_ups) = {
            let mut state = self.state.lock();
            let descriptors = state.descriptors.clone();
            let markers = section_markers(&descriptors);
            let wanted: HashSet<String> = descriptors.iter().map(RootDescriptor::key).collect();

            let mut remaining = Vec::new();
            for id in state.top.clone() {
                let key = state
                    .node(id)
                    .and_then(|n| n.descriptor.as_ref())
                    .map(RootDescriptor::key);
                match key {
                    Some(key) if wanted.contains(&key) => remaining.push((id, key)),
                    _ => {
                        tracing::debug!("[Tree] Removing root {}", id);
                        state.drop_subtree(id);
                    }
                }
            }

            let mut top = Vec::with_capacity(descriptors.len());
            let mut resolve: Vec<NodeId> = Vec::new();
            let mut follow_ups: Vec<(NodeId, bool)> = Vec::new();

            for (descriptor, marker) in descriptors.iter().zip(markers) {
                let key = descriptor.key();
                let existing = remaining
                    .iter()
                    .position(|(_, k)| *k == key)
                    .map(|pos| remaining.remove(pos).0);

                let id = match existing {
                    Some(id) => {
                        if let Some(node) = state.node_mut(id) {
                            node.label = descriptor.label.clone();
                            node.descriptor = Some(descriptor.clone());
                            match node.kind {
                                NodeKind::EntryList { .. } => follow_ups.push((id, true)),
                                _ if recursive && node.kind.is_volume_root() => {
                                    follow_ups.push((id, true))
                                }
                                _ => {}
                            }
                        }
                        id
                    }
                    None => {
                        let id = state.add_root(descriptor);
                        if let Some(node) = state.node(id) {
                            if node.kind.is_volume_root() {
                                resolve.push(id);
                            } else if matches!(node.kind, NodeKind::EntryList { .. }) {
                                follow_ups.push((id, false));
                            }
                        }
                        id
                    }
                };
                if let Some(node) = state.node_mut(id) {
                    node.section_start = marker;
                }
                top.push(id);
            }

            // Duplicate descriptors leave unmatched nodes behind.
            for (id, _) in remaining {
                state.drop_subtree(id);
            }
            state.top = top;
            (resolve, follow_ups)
        };
        self.flush_listeners();

        // New volumes resolve their display root, then list their children.
        join_all(resolve.into_iter().map(|id| async move {
            match self.ensure_display_root(id).await {
                Ok(_) => {
                    if let Err(err) = self.update_sub_directories(id, false).await {
                        tracing::trace!("[Tree] Initial refresh of {} skipped: {}", id, err);
                    }
                }
                Err(err) => tracing::debug!("[Tree] Display root of {} unavailable: {}", id, err),
            }
        }))
        .await;

        self.run_follow_ups(follow_ups).await;
    }
}
