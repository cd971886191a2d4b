//! Child refresh: read a node's listing and reconcile its children.

use futures::future::{join_all, BoxFuture};
use std::collections::HashSet;

use super::state::{Decoration, TreeState};
use super::DirectoryTree;
use crate::entry::{Entry, RootType, VolumeInfo};
use crate::error::TreeError;
use crate::grouping::{self, GroupingAction, GroupingKind};
use crate::namespace::read_subdirectories;
use crate::node::{HasChildren, NodeId, NodeKind};
use crate::reconcile::{plan, EditSummary, SiblingEdit};
use crate::sort::SortPolicy;

/// Result of one refresh of a node's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The listing was read and applied
    Applied(EditSummary),
    /// A refresh of this node was already in flight
    Busy,
    /// The node has no entry to read yet
    Unavailable,
    /// The node was removed while its listing was being read
    Stale,
}

enum Work {
    Listing { entry: Entry, policy: SortPolicy },
    Grouped { primary: Entry, volume: VolumeInfo },
}

/// Node to refresh after a lock section, and whether recursively
type FollowUp = (NodeId, bool);

/// Clears a node's `loading` flag if its refresh is dropped before the
/// listing is applied.
struct LoadingGuard<'a> {
    tree: &'a DirectoryTree,
    id: NodeId,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(tree: &'a DirectoryTree, id: NodeId) -> Self {
        Self {
            tree,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(node) = self.tree.state.lock().node_mut(self.id) {
            node.loading = false;
        }
    }
}

/// Grouping container read for a grouped root
struct GroupingRead {
    kind: GroupingKind,
    root: Entry,
    decoration: Decoration,
    child_count: usize,
}

impl DirectoryTree {
    /// Re-read the children of `id` and reconcile them.
    ///
    /// With `recursive`, kept children of an expanded node are refreshed
    /// too; delayed nodes only descend into children that are expanded.
    pub fn update_sub_directories(
        &self,
        id: NodeId,
        recursive: bool,
    ) -> BoxFuture<'_, Result<RefreshOutcome, TreeError>> {
        Box::pin(async move {
            let work = {
                let mut state = self.state.lock();
                let node = state.node_mut(id).ok_or(TreeError::UnknownNode(id))?;
                if node.loading {
                    return Ok(RefreshOutcome::Busy);
                }
                if !node.kind.can_have_children() {
                    node.has_children = HasChildren::No;
                    return Ok(RefreshOutcome::Applied(EditSummary::default()));
                }
                let Some(entry) = node.entry.clone() else {
                    return Ok(RefreshOutcome::Unavailable);
                };
                node.loading = true;
                match &node.kind {
                    NodeKind::GroupedVolume { volume } => Work::Grouped {
                        primary: entry,
                        volume: volume.clone(),
                    },
                    kind => Work::Listing {
                        entry,
                        policy: kind.sort_policy(),
                    },
                }
            };
            let loading = LoadingGuard::new(self, id);

            match work {
                Work::Listing { entry, policy } => {
                    self.refresh_listing(id, entry, policy, recursive, loading)
                        .await
                }
                Work::Grouped { primary, volume } => {
                    self.refresh_grouped(id, primary, volume, recursive, loading)
                        .await
                }
            }
        })
    }

    async fn refresh_listing(
        &self,
        id: NodeId,
        entry: Entry,
        policy: SortPolicy,
        recursive: bool,
        mut loading: LoadingGuard<'_>,
    ) -> Result<RefreshOutcome, TreeError> {
        let mut target = match read_subdirectories(self.namespace.as_ref(), &entry).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("[Tree] Cannot list {}: {}", entry.url(), err);
                Vec::new()
            }
        };
        let filter = self.current_filter();
        target.retain(|e| filter.accept(e));
        policy.sort(&mut target);
        let decorations = self.decorate(&target);

        let applied = {
            let mut state = self.state.lock();
            loading.disarm();
            match state.node_mut(id) {
                Some(node) => node.loading = false,
                None => {
                    tracing::trace!("[Tree] Dropping listing of removed node {}", id);
                    return Ok(RefreshOutcome::Stale);
                }
            }
            apply_listing(&mut state, id, &target, decorations, &policy, recursive)
        };
        self.flush_listeners();

        let (summary, follow_ups) = applied;
        if !summary.is_noop() {
            tracing::debug!(
                "[Tree] {} reconciled: +{} -{} ={}",
                entry.url(),
                summary.inserted,
                summary.removed,
                summary.kept
            );
        }
        self.run_follow_ups(follow_ups).await;
        Ok(RefreshOutcome::Applied(summary))
    }

    /// Grouped roots show a fixed list: the primary root, one node per
    /// non-empty grouping, then the virtual entries.
    async fn refresh_grouped(
        &self,
        id: NodeId,
        primary: Entry,
        volume: VolumeInfo,
        recursive: bool,
        mut loading: LoadingGuard<'_>,
    ) -> Result<RefreshOutcome, TreeError> {
        let mut groupings = Vec::new();
        for kind in GroupingKind::ALL {
            let Some(root) = kind.backing_root(&volume) else {
                continue;
            };
            let child_count = match read_subdirectories(self.namespace.as_ref(), root).await {
                Ok(children) => children.len(),
                Err(err) => {
                    tracing::debug!("[Tree] Cannot list grouping {}: {}", root.url(), err);
                    0
                }
            };
            let decoration = self.decorate_one(root);
            groupings.push(GroupingRead {
                kind,
                root: root.clone(),
                decoration,
                child_count,
            });
        }

        let mut fakes: Vec<Entry> = if self.settings.fake_entries_visible {
            volume.fake_entries.clone()
        } else {
            Vec::new()
        };
        fakes.sort_by(|a, b| b.url().cmp(a.url()));
        let fake_decorations = self.decorate(&fakes);
        let fake_types: Vec<RootType> = fakes
            .iter()
            .map(|e| {
                self.namespace
                    .location_info(e)
                    .map(|l| l.root_type)
                    .unwrap_or(RootType::DriveFakeRoot)
            })
            .collect();
        let primary_decoration = self.decorate_one(&primary);

        let applied = {
            let mut state = self.state.lock();
            loading.disarm();
            match state.node_mut(id) {
                Some(node) => node.loading = false,
                None => {
                    tracing::trace!("[Tree] Dropping grouped refresh of removed node {}", id);
                    return Ok(RefreshOutcome::Stale);
                }
            }
            apply_grouped(
                &mut state,
                id,
                (primary, primary_decoration),
                groupings,
                fakes
                    .into_iter()
                    .zip(fake_types)
                    .zip(fake_decorations)
                    .map(|((entry, root_type), decoration)| (entry, root_type, decoration))
                    .collect(),
                recursive,
            )
        };
        self.flush_listeners();

        let (summary, follow_ups) = applied;
        self.run_follow_ups(follow_ups).await;
        Ok(RefreshOutcome::Applied(summary))
    }

    pub(crate) async fn run_follow_ups(&self, follow_ups: Vec<FollowUp>) {
        if follow_ups.is_empty() {
            return;
        }
        let results = join_all(
            follow_ups
                .iter()
                .map(|(child, recursive)| self.update_sub_directories(*child, *recursive)),
        )
        .await;
        for ((child, _), result) in follow_ups.iter().zip(results) {
            if let Err(err) = result {
                tracing::trace!("[Tree] Follow-up refresh of {} skipped: {}", child, err);
            }
        }
    }
}

/// Reconcile the children of `id` against the sorted `target`.
fn apply_listing(
    state: &mut TreeState,
    id: NodeId,
    target: &[Entry],
    decorations: Vec<Decoration>,
    policy: &SortPolicy,
    recursive: bool,
) -> (EditSummary, Vec<FollowUp>) {
    let Some(node) = state.node(id) else {
        return (EditSummary::default(), Vec::new());
    };
    let expanded = node.expanded;
    let delay = node.delay_expansion;
    let is_entry_list = matches!(node.kind, NodeKind::EntryList { .. });

    let mut current = Vec::with_capacity(node.children.len());
    let mut orphans = Vec::new();
    for child in &node.children {
        match state.node(*child).and_then(|c| c.entry.clone()) {
            Some(entry) => current.push((*child, entry)),
            None => orphans.push(*child),
        }
    }
    for orphan in orphans {
        state.drop_subtree(orphan);
    }

    let mut decorations: Vec<Option<Decoration>> = decorations.into_iter().map(Some).collect();
    let refs: Vec<&Entry> = current.iter().map(|(_, e)| e).collect();
    let edits = plan(target, &refs, |a, b| policy.compare(a, b));
    let summary = EditSummary::of(&edits);

    let mut children = Vec::with_capacity(target.len());
    let mut follow_ups = Vec::new();
    for edit in edits {
        match edit {
            SiblingEdit::Keep {
                target: i,
                current: j,
            } => {
                let child = current[j].0;
                children.push(child);
                let Some(node) = state.node_mut(child) else {
                    continue;
                };
                if let Some(decoration) = decorations.get(i).and_then(Option::as_ref) {
                    node.label = decoration.label.clone();
                    node.icon = decoration.icon;
                }
                if recursive && expanded {
                    if delay {
                        if node.expanded {
                            follow_ups.push((child, true));
                        }
                        node.has_children = HasChildren::Yes;
                    } else {
                        follow_ups.push((child, true));
                    }
                }
            }
            SiblingEdit::Insert { target: i } => {
                let decoration = decorations
                    .get_mut(i)
                    .and_then(Option::take)
                    .unwrap_or_else(|| Decoration::plain(&target[i]));
                let child = state.add_directory(id, target[i].clone(), decoration, None);
                children.push(child);
                if expanded && !delay {
                    follow_ups.push((child, false));
                }
            }
            SiblingEdit::Remove { current: j } => {
                state.drop_subtree(current[j].0);
            }
        }
    }

    let empty = children.is_empty();
    if let Some(node) = state.node_mut(id) {
        node.children = children;
        if empty {
            node.has_children = HasChildren::No;
            node.expanded = false;
        } else {
            node.has_children = HasChildren::Yes;
            if is_entry_list {
                node.expanded = true;
            }
        }
    }
    if empty {
        state.unsubscribe(id);
    }

    (summary, follow_ups)
}

/// Rebuild the fixed child list of a grouped root.
fn apply_grouped(
    state: &mut TreeState,
    id: NodeId,
    primary: (Entry, Decoration),
    groupings: Vec<GroupingRead>,
    fakes: Vec<(Entry, RootType, Decoration)>,
    recursive: bool,
) -> (EditSummary, Vec<FollowUp>) {
    let Some(node) = state.node(id) else {
        return (EditSummary::default(), Vec::new());
    };
    let expanded = node.expanded;
    let existing = node.children.clone();

    let mut summary = EditSummary::default();
    let mut follow_ups = Vec::new();
    let mut children = Vec::new();
    let mut used = HashSet::new();

    let (primary_entry, primary_decoration) = primary;
    let found = existing.iter().copied().find(|c| {
        state.node(*c).is_some_and(|n| {
            n.grouping.is_none() && matches!(n.kind, NodeKind::Directory) && n.shows(&primary_entry)
        })
    });
    match found {
        Some(child) => {
            summary.kept += 1;
            used.insert(child);
            children.push(child);
            if recursive && expanded {
                follow_ups.push((child, true));
            }
        }
        None => {
            let child = state.add_directory(id, primary_entry, primary_decoration, None);
            summary.inserted += 1;
            children.push(child);
            if expanded {
                follow_ups.push((child, false));
            }
        }
    }

    let mut present = Vec::new();
    for read in groupings {
        let existing_node = existing
            .iter()
            .copied()
            .find(|c| state.node(*c).is_some_and(|n| n.grouping == Some(read.kind)));
        match grouping::decide(read.kind, existing_node, read.child_count, &present) {
            GroupingAction::Create { index } => {
                let child = state.add_directory(id, read.root, read.decoration, Some(read.kind));
                tracing::debug!("[Tree] Grouping {:?} appeared at {}", read.kind, index);
                children.insert(index.min(children.len()), child);
                present.push(read.kind);
                summary.inserted += 1;
                follow_ups.push((child, false));
            }
            GroupingAction::Keep { node } => {
                used.insert(node);
                children.push(node);
                present.push(read.kind);
                summary.kept += 1;
                if recursive && expanded {
                    follow_ups.push((node, true));
                }
            }
            GroupingAction::Remove { .. } => {
                tracing::debug!("[Tree] Grouping {:?} is empty, removing", read.kind);
            }
            GroupingAction::Absent => {}
        }
    }

    for (entry, root_type, decoration) in fakes {
        let found = existing.iter().copied().find(|c| {
            state
                .node(*c)
                .is_some_and(|n| matches!(n.kind, NodeKind::Fake { .. }) && n.shows(&entry))
        });
        match found {
            Some(child) => {
                used.insert(child);
                children.push(child);
                summary.kept += 1;
            }
            None => {
                children.push(state.add_fake(id, entry, root_type, decoration));
                summary.inserted += 1;
            }
        }
    }

    for stale in existing.into_iter().filter(|c| !used.contains(c)) {
        state.drop_subtree(stale);
        summary.removed += 1;
    }

    if let Some(node) = state.node_mut(id) {
        node.children = children;
        node.has_children = HasChildren::Yes;
    }

    (summary, follow_ups)
}
