//! Rendering projection of the tree

use serde::Serialize;

use crate::node::{HasChildren, IconDescriptor, NodeId};
use crate::roots::Section;
use crate::tree::state::TreeState;

/// One visible row plus its materialized children
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: NodeId,
    pub label: String,
    pub icon: IconDescriptor,
    pub has_children: HasChildren,
    pub expanded: bool,
    pub selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_start: Option<Section>,
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub(crate) fn build(state: &TreeState) -> Vec<RenderNode> {
        state
            .top
            .iter()
            .filter_map(|id| Self::build_node(state, *id))
            .collect()
    }

    fn build_node(state: &TreeState, id: NodeId) -> Option<RenderNode> {
        let node = state.node(id)?;
        Some(RenderNode {
            id,
            label: node.label.clone(),
            icon: node.icon,
            has_children: node.has_children,
            expanded: node.expanded,
            selected: state.selected == Some(id),
            section_start: node.section_start,
            children: node
                .children
                .iter()
                .filter_map(|child| Self::build_node(state, *child))
                .collect(),
        })
    }
}
