//! Layered (hierarchical) graph layout.
//!
//! The board talks to the engine only through [`GraphLayout`]: register nodes
//! with a size, register edges, set graph options, run once and read back the
//! centre of every node. [`DagreLayout`] is the default engine and hands the
//! actual ranking and positioning to `dugong`.

use dugong::graphlib::{Graph, GraphOptions as GraphlibOptions};
use dugong::{EdgeLabel, GraphLabel, NodeLabel};

use crate::graph::Point;
use crate::layout::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDir {
    /// Ranks flow top to bottom.
    TopBottom,
    /// Ranks flow left to right.
    LeftRight,
}

impl RankDir {
    fn to_dagre(self) -> dugong::RankDir {
        match self {
            RankDir::TopBottom => dugong::RankDir::TB,
            RankDir::LeftRight => dugong::RankDir::LR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphOptions {
    pub rankdir: RankDir,
    /// Gap between adjacent nodes inside a rank.
    pub nodesep: f32,
    /// Gap between adjacent ranks.
    pub ranksep: f32,
    /// Gap between edges routed through the same rank.
    pub edgesep: f32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            rankdir: RankDir::TopBottom,
            nodesep: 50.0,
            ranksep: 50.0,
            edgesep: 10.0,
        }
    }
}

pub trait GraphLayout {
    fn set_options(&mut self, options: GraphOptions);
    fn set_node(&mut self, id: &str, width: f32, height: f32);
    fn set_edge(&mut self, source: &str, target: &str);
    fn run(&mut self) -> Result<(), LayoutError>;
    fn node_center(&self, id: &str) -> Option<Point>;
}

pub struct DagreLayout {
    graph: Graph<NodeLabel, EdgeLabel, GraphLabel>,
    // graphlib creates missing endpoints on `set_edge`, so edges wait for `run`.
    edges: Vec<(String, String)>,
}

impl Default for DagreLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl DagreLayout {
    pub fn new() -> Self {
        let mut graph = Graph::new(GraphlibOptions {
            multigraph: true,
            ..Default::default()
        });
        graph.set_graph(GraphOptions::default().to_label());
        Self {
            graph,
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl GraphOptions {
    fn to_label(self) -> GraphLabel {
        GraphLabel {
            rankdir: self.rankdir.to_dagre(),
            nodesep: f64::from(self.nodesep),
            ranksep: f64::from(self.ranksep),
            edgesep: f64::from(self.edgesep),
            ..Default::default()
        }
    }
}

impl GraphLayout for DagreLayout {
    fn set_options(&mut self, options: GraphOptions) {
        self.graph.set_graph(options.to_label());
    }

    fn set_node(&mut self, id: &str, width: f32, height: f32) {
        self.graph.set_node(
            id,
            NodeLabel {
                width: f64::from(width),
                height: f64::from(height),
                ..Default::default()
            },
        );
    }

    fn set_edge(&mut self, source: &str, target: &str) {
        self.edges.push((source.to_string(), target.to_string()));
    }

    fn run(&mut self) -> Result<(), LayoutError> {
        for (idx, (source, target)) in self.edges.iter().enumerate() {
            for endpoint in [source, target] {
                if !self.graph.has_node(endpoint) {
                    return Err(LayoutError::UnknownNode {
                        node: endpoint.clone(),
                        from: source.clone(),
                        to: target.clone(),
                    });
                }
            }
            let label = EdgeLabel {
                minlen: 1,
                weight: 1.0,
                ..Default::default()
            };
            self.graph.set_edge_named(
                source.clone(),
                target.clone(),
                Some(format!("edge-{idx}")),
                Some(label),
            );
        }

        tracing::debug!(
            nodes = self.graph.node_count(),
            edges = self.edges.len(),
            "running layered layout"
        );
        dugong::layout(&mut self.graph);
        Ok(())
    }

    fn node_center(&self, id: &str) -> Option<Point> {
        let label = self.graph.node(id)?;
        Some(Point::new(label.x? as f32, label.y? as f32))
    }
}
