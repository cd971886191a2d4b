//! Selection following and activation.

use futures::future::BoxFuture;
use std::sync::atomic::Ordering;

use super::state::TreeState;
use super::DirectoryTree;
use crate::entry::Entry;
use crate::error::TreeError;
use crate::node::{HasChildren, NodeId, NodeKind};

/// Result of [`DirectoryTree::select_by_entry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The entry was already selected
    Unchanged,
    Selected(NodeId),
    /// No node shows the entry; the selection was cleared
    NotFound,
    /// A later selection started before this one could commit
    Superseded,
}

/// Where a search for an entry ended
enum Search {
    Found(NodeId),
    Missing,
    Superseded,
}

impl DirectoryTree {
    /// Follow the current directory: select the node showing `entry`,
    /// materializing the path to it when needed.
    ///
    /// Every call takes a new sequence number. A call only commits its
    /// selection while its number is still the latest.
    pub async fn select_by_entry(&self, entry: &Entry) -> Result<SelectOutcome, TreeError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let already = {
            let state = self.state.lock();
            state
                .selected
                .and_then(|id| state.node(id))
                .is_some_and(|n| n.shows(entry))
        };
        if already {
            return Ok(SelectOutcome::Unchanged);
        }

        match self.search_and_select(None, entry, sequence).await? {
            Search::Found(id) => return Ok(SelectOutcome::Selected(id)),
            Search::Superseded => return Ok(superseded(entry)),
            Search::Missing => {}
        }

        self.update_roots(false).await;

        let Some(volume) = self.namespace.volume_info(entry) else {
            tracing::debug!("[Tree] {} is not on a known volume", entry.url());
            return Ok(SelectOutcome::NotFound);
        };
        let root = self.namespace.resolve_display_root(&volume).await;

        if !self.is_current(sequence) {
            return Ok(superseded(entry));
        }

        match root {
            Ok(root) => self.adopt_display_root(&volume.volume_id, &root),
            Err(err) => tracing::debug!(
                "[Tree] Display root of {} unavailable: {}",
                volume.volume_id,
                err
            ),
        }

        match self.search_and_select(None, entry, sequence).await? {
            Search::Found(id) => Ok(SelectOutcome::Selected(id)),
            Search::Superseded => Ok(superseded(entry)),
            Search::Missing => {
                let mut state = self.state.lock();
                if !self.is_current(sequence) {
                    drop(state);
                    return Ok(superseded(entry));
                }
                state.selected = None;
                Ok(SelectOutcome::NotFound)
            }
        }
    }

    /// The current directory changed outside the tree.
    pub async fn on_current_directory_changed(
        &self,
        entry: &Entry,
    ) -> Result<SelectOutcome, TreeError> {
        self.select_by_entry(entry).await
    }

    fn is_current(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    /// Hand the search for `entry` to the matching child of `parent` (the
    /// top level for `None`).
    fn search_and_select<'a>(
        &'a self,
        parent: Option<NodeId>,
        entry: &'a Entry,
        sequence: u64,
    ) -> BoxFuture<'a, Result<Search, TreeError>> {
        Box::pin(async move {
            let candidate = self.state.lock().search_candidate(parent, entry);
            match candidate {
                Some(child) => self.select_within(child, entry, sequence).await,
                None => Ok(Search::Missing),
            }
        })
    }

    /// Select `entry` at or below `id`, reading `id` once if the entry is not
    /// materialized yet.
    async fn select_within(
        &self,
        id: NodeId,
        entry: &Entry,
        sequence: u64,
    ) -> Result<Search, TreeError> {
        let exact = {
            let state = self.state.lock();
            let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
            node.shows(entry) && !node.kind.supports_grouping()
        };
        if exact {
            return self.select_if_current(id, sequence);
        }

        match self.search_and_select(Some(id), entry, sequence).await? {
            Search::Missing => {}
            done => return Ok(done),
        }

        if !self.is_current(sequence) {
            return Ok(Search::Superseded);
        }
        self.update_sub_directories(id, false).await?;
        self.search_and_select(Some(id), entry, sequence).await
    }

    /// Select `id` unless a later selection request has started.
    fn select_if_current(&self, id: NodeId, sequence: u64) -> Result<Search, TreeError> {
        let (target, revealed) = {
            let mut state = self.state.lock();
            if !self.is_current(sequence) {
                return Ok(Search::Superseded);
            }
            let target = selection_target(&state, id)?;
            (target, state.select(target))
        };
        self.listen_to_revealed(revealed);
        tracing::trace!("[Tree] Selected {}", target);
        Ok(Search::Found(target))
    }

    /// Select `id`. Grouped roots pass the selection to their primary child
    /// once it exists.
    pub fn select(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let (target, revealed) = {
            let mut state = self.state.lock();
            let target = selection_target(&state, id)?;
            (target, state.select(target))
        };
        self.listen_to_revealed(revealed);
        tracing::trace!("[Tree] Selected {}", target);
        Ok(target)
    }

    /// Ancestors opened by a selection get the metadata listener that
    /// expanding them would have registered.
    fn listen_to_revealed(&self, revealed: Vec<(NodeId, Entry)>) {
        let listening: Vec<NodeId> = revealed
            .into_iter()
            .filter(|(_, entry)| {
                self.namespace
                    .location_info(entry)
                    .is_some_and(|l| l.root_type.supports_drive_icons())
            })
            .map(|(id, _)| id)
            .collect();
        if listening.is_empty() {
            return;
        }
        {
            let mut state = self.state.lock();
            for id in listening {
                state.subscribe(id);
            }
        }
        self.flush_listeners();
    }

    /// Act on a user pick of `id`.
    pub async fn activate(&self, id: NodeId) -> Result<(), TreeError> {
        let (kind, entry, descriptor) = {
            let state = self.state.lock();
            let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
            (node.kind.clone(), node.entry.clone(), node.descriptor.clone())
        };
        tracing::debug!("[Tree] Activating {} node {}", kind.name(), id);

        match kind {
            NodeKind::Directory | NodeKind::EntryList { .. } | NodeKind::Fake { .. } => {
                if let Some(entry) = entry {
                    self.model.activate_directory(&entry);
                }
                Ok(())
            }
            NodeKind::Volume { .. } => self.activate_volume(id).await,
            NodeKind::GroupedVolume { .. } => {
                self.activate_volume(id).await?;
                self.select(id)?;
                Ok(())
            }
            NodeKind::Shortcut => {
                let url = entry.map(|e| e.url().to_string()).unwrap_or_default();
                match self.namespace.resolve(&url).await {
                    Ok(resolved) => {
                        if self.model.current_directory().as_ref() != Some(&resolved) {
                            self.model.change_directory(&resolved);
                        }
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!("[Tree] Shortcut target {} unavailable: {}", url, err);
                        if let Some(descriptor) = descriptor {
                            self.model.on_item_not_found(&descriptor);
                        }
                        Err(TreeError::TargetNotFound(url))
                    }
                }
            }
        }
    }

    /// Navigate to a volume's display root and refresh its children.
    async fn activate_volume(&self, id: NodeId) -> Result<(), TreeError> {
        let (volume, descriptor) = {
            let state = self.state.lock();
            let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
            (node.kind.volume().cloned(), node.descriptor.clone())
        };
        let Some(volume) = volume else {
            return Err(TreeError::Unavailable(id));
        };

        match self.namespace.resolve_display_root(&volume).await {
            Ok(root) => {
                self.adopt_display_root(&volume.volume_id, &root);
                if self.model.current_directory().as_ref() != Some(&root) {
                    self.model.change_directory(&root);
                }
                self.update_sub_directories(id, false).await?;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("[Tree] Volume {} unavailable: {}", volume.volume_id, err);
                if let Some(descriptor) = descriptor {
                    self.model.on_item_not_found(&descriptor);
                }
                Err(TreeError::TargetNotFound(volume.volume_id))
            }
        }
    }

    /// Select and activate the top-level node at `index`.
    pub async fn activate_by_index(&self, index: usize) -> Result<bool, TreeError> {
        let Some(id) = self.state.lock().top.get(index).copied() else {
            return Ok(false);
        };
        self.select(id)?;
        self.activate(id).await?;
        Ok(true)
    }

    /// Show a directory that was just created below `parent` and select it.
    ///
    /// The parent is expanded; the new node goes to its sorted position
    /// without re-reading the parent. An existing node is reused.
    pub fn update_and_select_new_directory(
        &self,
        parent: NodeId,
        new_dir: &Entry,
    ) -> Result<NodeId, TreeError> {
        let decoration = self.decorate_one(new_dir);
        let (child, revealed) = {
            let mut state = self.state.lock();
            let node = state.node(parent).ok_or(TreeError::UnknownNode(parent))?;
            let Some(parent_entry) = node.entry.clone() else {
                return Err(TreeError::Unavailable(parent));
            };
            let policy = node.kind.sort_policy();
            let siblings = node.children.clone();
            let was_expanded = node.expanded;

            let existing = siblings
                .iter()
                .copied()
                .find(|c| state.node(*c).is_some_and(|n| n.shows(new_dir)));
            match existing {
                Some(existing) => (existing, state.select(existing)),
                None => {
                    let index = siblings
                        .iter()
                        .position(|c| {
                            state
                                .node(*c)
                                .and_then(|n| n.entry.as_ref())
                                .is_some_and(|e| policy.compare(e, new_dir).is_gt())
                        })
                        .unwrap_or(siblings.len());

                    let child = state.add_directory(parent, new_dir.clone(), decoration, None);
                    if let Some(node) = state.node_mut(parent) {
                        node.children.insert(index, child);
                        node.has_children = HasChildren::Yes;
                        node.expanded = true;
                    }
                    let mut revealed = state.select(child);
                    if !was_expanded {
                        revealed.push((parent, parent_entry));
                    }
                    tracing::debug!("[Tree] Added new directory {}", new_dir.url());
                    (child, revealed)
                }
            }
        };
        self.listen_to_revealed(revealed);
        Ok(child)
    }
}

fn superseded(entry: &Entry) -> SelectOutcome {
    tracing::trace!("[Tree] Dropping stale selection of {}", entry.url());
    SelectOutcome::Superseded
}

/// Node that receives a selection of `id`.
fn selection_target(state: &TreeState, id: NodeId) -> Result<NodeId, TreeError> {
    let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
    if !node.kind.supports_grouping() {
        return Ok(id);
    }
    Ok(node
        .children
        .first()
        .copied()
        .filter(|c| state.node(*c).is_some_and(|n| n.grouping.is_none()))
        .unwrap_or(id))
}
