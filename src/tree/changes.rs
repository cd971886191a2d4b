//! External change propagation.
//!
//! A change names one directory. If it still resolves, only the subtree
//! under it is refreshed. If it is gone, the walk goes up one parent at a
//! time until something resolves; when no parent can be obtained (or the
//! walk runs past the entry's own depth) the owning volume is refreshed
//! recursively instead.

use futures::future::BoxFuture;
use serde::Serialize;

use super::DirectoryTree;
use crate::entry::{Entry, VolumeInfo};
use crate::error::TreeError;
use crate::grouping::GroupingKind;
use crate::metadata::MetadataUpdate;
use crate::node::{NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryChangeKind {
    Created,
    Deleted,
}

/// Change notification from the namespace
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// Something inside a watched directory changed
    DirectoryChanged { entry: Entry },
    /// Entries were created or deleted through the file manager itself
    EntriesChanged {
        kind: EntryChangeKind,
        entries: Vec<Entry>,
    },
}

/// What a single change ended up refreshing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// The subtree of this live entry was refreshed
    Refreshed { entry: Entry },
    /// The entry is live but no materialized node shows it
    NotShown { entry: Entry },
    /// Nothing resolved; the whole volume was refreshed
    VolumeFallback { volume_id: String },
    /// The entry is not on any known volume
    Dropped,
}

impl DirectoryTree {
    pub async fn handle_change(&self, event: ChangeEvent) -> Vec<PropagationOutcome> {
        match event {
            ChangeEvent::DirectoryChanged { entry } => vec![self.update_tree_by_entry(&entry).await],
            ChangeEvent::EntriesChanged { kind, entries } => {
                let mut outcomes = Vec::new();
                for entry in entries.iter().filter(|e| e.is_directory()) {
                    let outcome = match kind {
                        EntryChangeKind::Created => match self.namespace.parent(entry).await {
                            Ok(parent) => self.update_tree_by_entry(&parent).await,
                            Err(err) => {
                                tracing::debug!(
                                    "[Tree] No parent for created {}: {}",
                                    entry.url(),
                                    err
                                );
                                PropagationOutcome::Dropped
                            }
                        },
                        EntryChangeKind::Deleted => self.update_tree_by_entry(entry).await,
                    };
                    outcomes.push(outcome);
                }
                outcomes
            }
        }
    }

    /// Refresh the part of the tree showing `changed`, walking up to the
    /// nearest live ancestor when it no longer exists.
    pub async fn update_tree_by_entry(&self, changed: &Entry) -> PropagationOutcome {
        let cap = self
            .settings
            .max_change_walk_depth
            .unwrap_or_else(|| changed.depth());
        let mut current = changed.clone();
        let mut steps = 0;

        loop {
            match self.namespace.resolve(current.url()).await {
                Ok(live) => {
                    return if self.refresh_subtree_of(&live).await {
                        PropagationOutcome::Refreshed { entry: live }
                    } else {
                        PropagationOutcome::NotShown { entry: live }
                    };
                }
                Err(err) => tracing::trace!("[Tree] {} is gone: {}", current.url(), err),
            }

            if steps >= cap {
                tracing::debug!("[Tree] Walk-up from {} hit its cap", changed.url());
                break;
            }
            match self.namespace.parent(&current).await {
                Ok(parent) => {
                    current = parent;
                    steps += 1;
                }
                Err(err) => {
                    tracing::trace!("[Tree] No parent for {}: {}", current.url(), err);
                    break;
                }
            }
        }

        let Some(volume) = self.namespace.volume_info(changed) else {
            return PropagationOutcome::Dropped;
        };
        let volume_nodes: Vec<NodeId> = {
            let state = self.state.lock();
            state
                .top
                .iter()
                .copied()
                .filter(|id| {
                    state
                        .node(*id)
                        .and_then(|n| n.kind.volume())
                        .is_some_and(|v| v.volume_id == volume.volume_id)
                })
                .collect()
        };
        for id in volume_nodes {
            if let Err(err) = self.update_sub_directories(id, true).await {
                tracing::trace!("[Tree] Volume refresh of {} skipped: {}", id, err);
            }
        }
        PropagationOutcome::VolumeFallback {
            volume_id: volume.volume_id,
        }
    }

    /// Ask every volume and entry-list root to refresh `changed`. Returns
    /// whether any node was refreshed.
    async fn refresh_subtree_of(&self, changed: &Entry) -> bool {
        let roots: Vec<NodeId> = {
            let state = self.state.lock();
            state
                .top
                .iter()
                .copied()
                .filter(|id| {
                    state.node(*id).is_some_and(|n| {
                        n.kind.is_volume_root() || matches!(n.kind, NodeKind::EntryList { .. })
                    })
                })
                .collect()
        };
        let mut refreshed = false;
        for id in roots {
            match self.update_item_by_entry(id, changed).await {
                Ok(hit) => refreshed |= hit,
                Err(err) => {
                    tracing::trace!("[Tree] Change routing through {} skipped: {}", id, err)
                }
            }
        }
        refreshed
    }

    /// Find the node showing `changed` below `id` and refresh it
    /// non-recursively. Returns whether a node was refreshed.
    pub fn update_item_by_entry<'a>(
        &'a self,
        id: NodeId,
        changed: &'a Entry,
    ) -> BoxFuture<'a, Result<bool, TreeError>> {
        Box::pin(async move {
            let (kind, shows, next) = {
                let state = self.state.lock();
                let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
                let next = node.children.iter().copied().find(|c| {
                    state.node(*c).is_some_and(|n| n.covers(changed))
                });
                (node.kind.clone(), node.shows(changed), next)
            };

            if let NodeKind::GroupedVolume { volume } = &kind {
                return self.update_grouped_item(id, volume.clone(), changed).await;
            }
            if shows {
                self.update_sub_directories(id, false).await?;
                return Ok(true);
            }
            match next {
                Some(child) => self.update_item_by_entry(child, changed).await,
                None => Ok(false),
            }
        })
    }

    /// Route a change inside a grouped root: to the grouping it belongs to
    /// (bringing the grouping back or dropping it as needed), otherwise to
    /// the primary root.
    async fn update_grouped_item(
        &self,
        id: NodeId,
        volume: VolumeInfo,
        changed: &Entry,
    ) -> Result<bool, TreeError> {
        if let Some(kind) = GroupingKind::containing(&volume, changed) {
            let is_backing_root = kind.backing_root(&volume) == Some(changed);
            match self.grouping_node(id, kind) {
                Some(node) if !is_backing_root => {
                    return self.update_item_by_entry(node, changed).await;
                }
                _ => {
                    // Whether the grouping exists depends on its child count.
                    self.update_sub_directories(id, false).await?;
                    return match self.grouping_node(id, kind) {
                        Some(node) if is_backing_root => {
                            self.update_sub_directories(node, false).await?;
                            Ok(true)
                        }
                        Some(node) => self.update_item_by_entry(node, changed).await,
                        None => Ok(true),
                    };
                }
            }
        }

        let primary = {
            let state = self.state.lock();
            state
                .node(id)
                .and_then(|n| n.children.first().copied())
                .filter(|c| state.node(*c).is_some_and(|n| n.grouping.is_none()))
        };
        match primary {
            Some(primary) => self.update_item_by_entry(primary, changed).await,
            None => Ok(false),
        }
    }

    fn grouping_node(&self, id: NodeId, kind: GroupingKind) -> Option<NodeId> {
        let state = self.state.lock();
        state
            .node(id)?
            .children
            .iter()
            .copied()
            .find(|c| state.node(*c).is_some_and(|n| n.grouping == Some(kind)))
    }

    /// Redraw icons of children of subscribed nodes named in `update`.
    /// Returns the number of rows touched.
    pub fn on_metadata_updated(&self, update: &MetadataUpdate) -> usize {
        if !update.touches_icons() {
            return 0;
        }
        let targets = self.state.lock().listening_children(&update.urls);
        if targets.is_empty() {
            return 0;
        }

        let entries: Vec<Entry> = targets.iter().map(|(_, e)| e.clone()).collect();
        let decorations = self.decorate(&entries);

        let mut state = self.state.lock();
        let mut touched = 0;
        for ((id, _), decoration) in targets.into_iter().zip(decorations) {
            if let Some(node) = state.node_mut(id) {
                node.icon = decoration.icon;
                touched += 1;
            }
        }
        tracing::trace!("[Tree] Metadata update touched {} rows", touched);
        touched
    }
}
