use crate::graph::{HandlePosition, Node, Point};

pub const DEFAULT_CARDS_PER_ROW: usize = 3;

const HORIZONTAL_GAP: f32 = 300.0;
const VERTICAL_GAP: f32 = 200.0;
const OFFSET: f32 = 50.0;

/// Packs nodes into a row-major grid, ignoring edges.
///
/// Every node gets top/bottom handles whatever direction the board was last
/// arranged in.
pub fn grid_layout(nodes: &[Node], cards_per_row: Option<usize>) -> Vec<Node> {
    let per_row = cards_per_row.unwrap_or(DEFAULT_CARDS_PER_ROW).max(1);

    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let column = (index % per_row) as f32;
            let row = (index / per_row) as f32;
            Node {
                position: Point::new(
                    column * HORIZONTAL_GAP + OFFSET,
                    row * VERTICAL_GAP + OFFSET,
                ),
                target_position: Some(HandlePosition::Top),
                source_position: Some(HandlePosition::Bottom),
                ..node.clone()
            }
        })
        .collect()
}
