use std::borrow::Cow;

use crate::graph::{Edge, HandleId, HandlePosition, Node, Point};
use crate::layout::engine::{DagreLayout, GraphLayout, GraphOptions, RankDir};
use crate::layout::{LayoutDirection, LayoutError};

/// Logical card size handed to the engine. Rendered size is never measured.
pub const NODE_WIDTH: f32 = 172.0;
pub const NODE_HEIGHT: f32 = 36.0;

const NODE_SEP: f32 = 50.0;
const RANK_SEP: f32 = 50.0;
const EDGE_SEP: f32 = 10.0;

impl LayoutDirection {
    pub fn rankdir(&self) -> RankDir {
        match self {
            LayoutDirection::Horizontal => RankDir::LeftRight,
            LayoutDirection::Vertical => RankDir::TopBottom,
        }
    }

    /// `(target, source)` sides for nodes laid out in this direction.
    pub fn handle_positions(&self) -> (HandlePosition, HandlePosition) {
        match self {
            LayoutDirection::Horizontal => (HandlePosition::Left, HandlePosition::Right),
            LayoutDirection::Vertical => (HandlePosition::Top, HandlePosition::Bottom),
        }
    }

    /// `(source, target)` handle identifiers stamped on every edge.
    pub fn edge_handles(&self) -> (HandleId, HandleId) {
        match self {
            LayoutDirection::Horizontal => (HandleId::RIGHT_SOURCE, HandleId::LEFT_TARGET),
            LayoutDirection::Vertical => (HandleId::BOTTOM_SOURCE, HandleId::TOP_TARGET),
        }
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            rankdir: self.rankdir(),
            nodesep: NODE_SEP,
            ranksep: RANK_SEP,
            edgesep: EDGE_SEP,
        }
    }
}

pub type LayoutResult<'a> = (Cow<'a, [Node]>, Cow<'a, [Edge]>);

/// Arranges `nodes` so edges flow in `direction`, using the dagre engine.
///
/// With no nodes the inputs come back borrowed, untouched. Callers use
/// `Cow::Borrowed` to tell that no layout was performed.
pub fn directed_layout<'a>(
    nodes: &'a [Node],
    edges: &'a [Edge],
    direction: LayoutDirection,
) -> Result<LayoutResult<'a>, LayoutError> {
    directed_layout_with(DagreLayout::new(), nodes, edges, direction)
}

pub fn directed_layout_with<'a, L: GraphLayout>(
    mut engine: L,
    nodes: &'a [Node],
    edges: &'a [Edge],
    direction: LayoutDirection,
) -> Result<LayoutResult<'a>, LayoutError> {
    if nodes.is_empty() {
        return Ok((Cow::Borrowed(nodes), Cow::Borrowed(edges)));
    }

    engine.set_options(direction.graph_options());
    for node in nodes {
        engine.set_node(&node.id, NODE_WIDTH, NODE_HEIGHT);
    }
    for edge in edges {
        engine.set_edge(&edge.source, &edge.target);
    }

    engine.run()?;

    let (target_position, source_position) = direction.handle_positions();
    let laid_out: Vec<Node> = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(center) = engine.node_center(&node.id) {
                node.position = Point::new(
                    center.x - NODE_WIDTH / 2.0,
                    center.y - NODE_HEIGHT / 2.0,
                );
            }
            node.target_position = Some(target_position);
            node.source_position = Some(source_position);
            node
        })
        .collect();

    let (source_handle, target_handle) = direction.edge_handles();
    let rewired: Vec<Edge> = edges
        .iter()
        .map(|edge| {
            let mut edge = edge.clone();
            edge.source_handle = Some(source_handle);
            edge.target_handle = Some(target_handle);
            edge
        })
        .collect();

    Ok((Cow::Owned(laid_out), Cow::Owned(rewired)))
}
