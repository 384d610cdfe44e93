//! In-memory idea-map state: the nodes, edges and viewport the canvas edits.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::edge_style::apply_edge_style;
use crate::graph::{Edge, HandleId, Node, Point, Viewport};
use crate::layout::{LayoutDirection, LayoutError, directed_layout, grid_layout};
use crate::settings::BoardSettings;
use crate::storage::{KeyValueStore, StorageError};

pub const FLOW_KEY: &str = "backyard-flow";

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("node '{0}' already exists")]
    DuplicateNode(String),
    #[error("node '{0}' not found")]
    UnknownNode(String),
    #[error("edge '{0}' not found")]
    UnknownEdge(String),
    #[error("nodes '{source_id}' and '{target_id}' are already connected")]
    AlreadyConnected { source_id: String, target_id: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored board is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Serialised board, as kept in the local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    viewport: Viewport,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), BoardError> {
        if self.node(&node.id).is_some() {
            return Err(BoardError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every edge attached to it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|edge| !edge.touches(id));
        true
    }

    pub fn move_node(&mut self, id: &str, position: Point) -> Result<(), BoardError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or_else(|| BoardError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Draws an edge between two existing nodes and returns its id.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        handles: Option<(HandleId, HandleId)>,
    ) -> Result<String, BoardError> {
        for endpoint in [source, target] {
            if self.node(endpoint).is_none() {
                return Err(BoardError::UnknownNode(endpoint.to_string()));
            }
        }
        if self
            .edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
        {
            return Err(BoardError::AlreadyConnected {
                source_id: source.to_string(),
                target_id: target.to_string(),
            });
        }

        let id = format!("edge-{}", Uuid::new_v4());
        let mut edge = Edge::new(id.clone(), source, target);
        if let Some((source_handle, target_handle)) = handles {
            edge = edge.with_handles(source_handle, target_handle);
        }
        self.edges.push(edge);
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, BoardError> {
        let index = self
            .edges
            .iter()
            .position(|edge| edge.id == id)
            .ok_or_else(|| BoardError::UnknownEdge(id.to_string()))?;
        Ok(self.edges.remove(index))
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Selects exactly the given edges, deselecting the rest.
    pub fn select_edges(&mut self, ids: &[&str]) {
        let wanted: HashSet<&str> = ids.iter().copied().collect();
        for edge in &mut self.edges {
            edge.selected = wanted.contains(edge.id.as_str());
        }
    }

    /// Runs the directed layout. Returns false when the board was empty and
    /// nothing changed.
    pub fn apply_directed_layout(&mut self, direction: LayoutDirection) -> Result<bool, BoardError> {
        let (nodes, edges) = directed_layout(&self.nodes, &self.edges, direction)?;
        let (Cow::Owned(nodes), Cow::Owned(edges)) = (nodes, edges) else {
            return Ok(false);
        };
        self.nodes = nodes;
        self.edges = edges;
        Ok(true)
    }

    pub fn apply_grid_layout(&mut self, cards_per_row: Option<usize>) {
        self.nodes = grid_layout(&self.nodes, cards_per_row);
    }

    pub fn styled_edges(&self, settings: &BoardSettings) -> Vec<Edge> {
        apply_edge_style(&self.edges, settings)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    pub fn save_to<S: KeyValueStore>(&self, store: &S) -> Result<(), BoardError> {
        let raw = serde_json::to_string(&self.snapshot())?;
        store.set_item(FLOW_KEY, &raw)?;
        Ok(())
    }

    /// Restores the board kept in `store`; an empty board when nothing is stored.
    pub fn load_from<S: KeyValueStore>(store: &S) -> Result<Self, BoardError> {
        match store.get_item(FLOW_KEY)? {
            Some(raw) => {
                let snapshot: BoardSnapshot = serde_json::from_str(&raw)?;
                Ok(Self::from(snapshot))
            }
            None => Ok(Self::default()),
        }
    }
}

impl From<BoardSnapshot> for Board {
    fn from(snapshot: BoardSnapshot) -> Self {
        Self {
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            viewport: snapshot.viewport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::HandlePosition;
    use crate::storage::MemoryStore;

    fn board_with(ids: &[&str]) -> Board {
        let mut board = Board::new();
        for id in ids {
            board.add_node(Node::new(*id, Point::default())).unwrap();
        }
        board
    }

    #[test]
    fn connect_requires_existing_endpoints() {
        let mut board = board_with(&["a", "b"]);
        let id = board.connect("a", "b", None).unwrap();
        assert!(id.starts_with("edge-"));
        assert!(matches!(
            board.connect("a", "ghost", None),
            Err(BoardError::UnknownNode(node)) if node == "ghost"
        ));
        assert!(matches!(
            board.connect("a", "b", None),
            Err(BoardError::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn removing_node_drops_incident_edges() {
        let mut board = board_with(&["a", "b", "c"]);
        board.connect("a", "b", None).unwrap();
        board.connect("b", "c", None).unwrap();
        let keep = board.connect("a", "c", None).unwrap();

        assert!(board.remove_node("b"));
        assert!(!board.remove_node("b"));
        assert_eq!(board.edges().len(), 1);
        assert_eq!(board.edges()[0].id, keep);
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut board = board_with(&["a"]);
        assert!(matches!(
            board.add_node(Node::new("a", Point::default())),
            Err(BoardError::DuplicateNode(_))
        ));
    }

    #[test]
    fn empty_board_layout_reports_no_change() {
        let mut board = Board::new();
        assert!(!board.apply_directed_layout(LayoutDirection::Vertical).unwrap());
    }

    #[test]
    fn directed_layout_rewires_handles() {
        let mut board = board_with(&["a", "b"]);
        board
            .connect("a", "b", Some((HandleId::BOTTOM_SOURCE, HandleId::TOP_TARGET)))
            .unwrap();

        assert!(board.apply_directed_layout(LayoutDirection::Horizontal).unwrap());
        assert_eq!(board.edges()[0].source_handle, Some(HandleId::RIGHT_SOURCE));
        assert_eq!(board.node("b").unwrap().target_position, Some(HandlePosition::Left));
        assert!(board.node("a").unwrap().position.x < board.node("b").unwrap().position.x);
    }

    #[test]
    fn snapshot_round_trips_through_store() {
        let store = MemoryStore::new();
        let mut board = board_with(&["a", "b"]);
        board.connect("a", "b", None).unwrap();
        board.move_node("b", Point::new(40.0, 80.0)).unwrap();
        board.set_viewport(Viewport {
            x: -20.0,
            y: 15.0,
            zoom: 1.5,
        });

        board.save_to(&store).unwrap();
        let restored = Board::load_from(&store).unwrap();

        assert_eq!(restored, board);
        assert_eq!(Board::load_from(&MemoryStore::new()).unwrap(), Board::new());
    }

    #[test]
    fn styled_edges_follow_selection() {
        let mut board = board_with(&["a", "b", "c"]);
        let first = board.connect("a", "b", None).unwrap();
        board.connect("b", "c", None).unwrap();
        board.select_edges(&[first.as_str()]);

        let settings = BoardSettings::default();
        let styled = board.styled_edges(&settings);
        assert_eq!(styled[0].style.as_ref().unwrap().stroke, settings.selected_edge_color);
        assert_eq!(styled[1].style.as_ref().unwrap().stroke, settings.edge_color);
    }
}
