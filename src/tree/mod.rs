//! Directory tree controller
//!
//! [`DirectoryTree`] owns the view-nodes and keeps them consistent with the
//! namespace. All node state sits behind one mutex that is never held across
//! an `.await`; every namespace call is a suspension point, so every
//! continuation re-checks that the node it was working on still exists.

mod changes;
mod refresh;
mod selection;
pub(crate) mod state;
mod sync;

#[cfg(test)]
mod tests;

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::entry::{Entry, LocationInfo};
use crate::error::TreeError;
use crate::filter::{EntryFilter, VisibilityFilter};
use crate::metadata::{MetadataCache, CONTAINER_PREFETCH_PROPERTY_NAMES, ICON_PROPERTY_NAMES};
use crate::navigation::DirectoryModel;
use crate::namespace::Namespace;
use crate::node::{entry_label, IconDescriptor, NodeId, ViewNode};
use crate::render::RenderNode;
use crate::settings::TreeSettings;

pub use changes::{ChangeEvent, EntryChangeKind, PropagationOutcome};
pub use refresh::RefreshOutcome;
pub use selection::SelectOutcome;

use state::{Decoration, ListenerCall, TreeState};

pub struct DirectoryTree {
    namespace: Arc<dyn Namespace>,
    metadata: Arc<dyn MetadataCache>,
    model: Arc<dyn DirectoryModel>,
    settings: TreeSettings,
    filter: RwLock<Arc<dyn EntryFilter>>,
    state: Mutex<TreeState>,
    /// Bumped by every selection that has to wait for a volume root
    sequence: AtomicU64,
}

impl DirectoryTree {
    pub fn new(
        namespace: Arc<dyn Namespace>,
        metadata: Arc<dyn MetadataCache>,
        model: Arc<dyn DirectoryModel>,
        settings: TreeSettings,
    ) -> Self {
        let filter: Arc<dyn EntryFilter> = Arc::new(VisibilityFilter::from_settings(&settings));
        Self {
            namespace,
            metadata,
            model,
            settings,
            filter: RwLock::new(filter),
            state: Mutex::new(TreeState::default()),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Top-level nodes in display order.
    pub fn roots(&self) -> Vec<NodeId> {
        self.state.lock().top.clone()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.state.lock().child_ids(Some(id))
    }

    /// Copy of a node's current state.
    pub fn node(&self, id: NodeId) -> Option<ViewNode> {
        self.state.lock().node(id).cloned()
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.state.lock().selected
    }

    pub fn clear_selection(&self) {
        self.state.lock().selected = None;
    }

    /// Node showing `entry`, if materialized.
    pub fn find(&self, entry: &Entry) -> Option<NodeId> {
        self.state.lock().find_by_entry(entry)
    }

    /// Rendering projection of the whole tree.
    pub fn snapshot(&self) -> Vec<RenderNode> {
        let state = self.state.lock();
        RenderNode::build(&state)
    }

    /// Expand `id` and refresh its children.
    ///
    /// A node that is loading ignores the request. Volume roots resolve their
    /// display root first; if that fails the node stays collapsed.
    pub async fn expand(&self, id: NodeId) -> Result<(), TreeError> {
        let needs_root = {
            let mut state = self.state.lock();
            let node = state.node_mut(id).ok_or(TreeError::UnknownNode(id))?;
            if node.loading || !node.kind.can_have_children() {
                return Ok(());
            }
            node.expanded = true;
            node.entry.is_none()
        };

        if needs_root {
            if let Err(err) = self.ensure_display_root(id).await {
                tracing::debug!("[Tree] Cannot expand {}: {}", id, err);
                self.set_collapsed(id);
                return Ok(());
            }
        }

        let entry = self.state.lock().node(id).and_then(|n| n.entry.clone());
        let location = entry.as_ref().and_then(|e| self.namespace.location_info(e));
        if location
            .as_ref()
            .is_some_and(|l| l.root_type.supports_drive_icons())
        {
            self.state.lock().subscribe(id);
            self.flush_listeners();
        }

        if self.update_sub_directories(id, true).await? == RefreshOutcome::Unavailable {
            self.set_collapsed(id);
            return Ok(());
        }

        if location.as_ref().is_some_and(|l| l.root_type.is_inside_drive()) {
            self.prefetch_children(id).await;
        }

        // A grouped root selected before its primary child existed hands the
        // selection down now.
        let reselect = {
            let state = self.state.lock();
            state.selected == Some(id)
                && state.node(id).is_some_and(|n| n.kind.supports_grouping())
        };
        if reselect {
            self.select(id)?;
        }
        Ok(())
    }

    /// Collapse `id`. Children of delayed nodes are collapsed too.
    pub fn collapse(&self, id: NodeId) -> Result<(), TreeError> {
        {
            let mut state = self.state.lock();
            if state.node(id).is_none() {
                return Err(TreeError::UnknownNode(id));
            }
            state.collapse(id);
        }
        self.flush_listeners();
        Ok(())
    }

    fn set_collapsed(&self, id: NodeId) {
        let mut state = self.state.lock();
        if let Some(node) = state.node_mut(id) {
            node.expanded = false;
        }
        state.unsubscribe(id);
        drop(state);
        self.flush_listeners();
    }

    async fn prefetch_children(&self, id: NodeId) {
        let entries: Vec<Entry> = {
            let state = self.state.lock();
            state
                .child_ids(Some(id))
                .iter()
                .filter_map(|c| state.node(*c).and_then(|n| n.entry.clone()))
                .collect()
        };
        if !entries.is_empty() {
            self.metadata
                .prefetch(&entries, &CONTAINER_PREFETCH_PROPERTY_NAMES)
                .await;
        }
    }

    /// Resolve and adopt the display root of a volume node.
    pub(crate) async fn ensure_display_root(&self, id: NodeId) -> Result<Entry, TreeError> {
        let volume = {
            let state = self.state.lock();
            let node = state.node(id).ok_or(TreeError::UnknownNode(id))?;
            if let Some(entry) = &node.entry {
                return Ok(entry.clone());
            }
            node.kind.volume().cloned().ok_or(TreeError::Unavailable(id))?
        };

        let root = self.namespace.resolve_display_root(&volume).await?;
        self.adopt_display_root(&volume.volume_id, &root);
        Ok(root)
    }

    /// Give every unresolved node of `volume_id` its display root.
    pub(crate) fn adopt_display_root(&self, volume_id: &str, root: &Entry) {
        let mut state = self.state.lock();
        for id in state.top.clone() {
            if let Some(node) = state.node_mut(id) {
                let matches = node.kind.volume().is_some_and(|v| v.volume_id == volume_id);
                if matches && node.entry.is_none() {
                    tracing::trace!("[Tree] Volume {} resolved to {}", volume_id, root.url());
                    node.entry = Some(root.clone());
                }
            }
        }
    }

    /// Deliver queued listener calls to the metadata cache.
    pub(crate) fn flush_listeners(&self) {
        let calls = self.state.lock().take_pending();
        for call in calls {
            match call {
                ListenerCall::Subscribe(id) => self.metadata.subscribe(id),
                ListenerCall::Unsubscribe(id) => self.metadata.unsubscribe(id),
            }
        }
    }

    /// Labels and icons for `entries`, read from the location info and the
    /// metadata cache. Never fetches.
    pub(crate) fn decorate(&self, entries: &[Entry]) -> Vec<Decoration> {
        let locations: Vec<Option<LocationInfo>> = entries
            .iter()
            .map(|e| self.namespace.location_info(e))
            .collect();
        let wants_metadata = locations
            .iter()
            .flatten()
            .any(|l| l.root_type.supports_drive_icons());
        let metadata = if wants_metadata {
            self.metadata.get_cached(entries, &ICON_PROPERTY_NAMES)
        } else {
            Vec::new()
        };

        entries
            .iter()
            .zip(locations.iter())
            .enumerate()
            .map(|(i, (entry, location))| Decoration {
                label: entry_label(location.as_ref(), entry),
                icon: IconDescriptor::for_directory(
                    entry,
                    location.as_ref(),
                    metadata.get(i).copied().unwrap_or_default(),
                ),
            })
            .collect()
    }

    pub(crate) fn decorate_one(&self, entry: &Entry) -> Decoration {
        self.decorate(std::slice::from_ref(entry))
            .pop()
            .unwrap_or_else(|| Decoration::plain(entry))
    }

    /// The filter currently in effect.
    pub(crate) fn current_filter(&self) -> Arc<dyn EntryFilter> {
        self.filter.read().clone()
    }

    /// Swap the visibility filter and redraw every root recursively.
    pub async fn set_filter(&self, filter: Arc<dyn EntryFilter>) {
        *self.filter.write() = filter;
        tracing::debug!("[Tree] Filter changed, redrawing");
        self.update_roots(true).await;
    }
}
