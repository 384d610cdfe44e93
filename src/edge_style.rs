use serde_json::{Map, Value};

use crate::graph::{Edge, EdgeStyle, MarkerEnd};
use crate::settings::BoardSettings;

/// Edge renderer every board edge is drawn with.
pub const EDGE_TYPE: &str = "smoothstep";

/// Stamps the presentation fields derived from `settings` onto every edge.
pub fn apply_edge_style(edges: &[Edge], settings: &BoardSettings) -> Vec<Edge> {
    let snapshot = serde_json::to_value(settings).unwrap_or(Value::Null);

    edges
        .iter()
        .map(|edge| {
            let color = if edge.selected {
                &settings.selected_edge_color
            } else {
                &settings.edge_color
            };

            let mut data = edge.data.clone().unwrap_or_else(Map::new);
            data.insert("settings".to_string(), snapshot.clone());

            Edge {
                kind: Some(EDGE_TYPE.to_string()),
                style: Some(EdgeStyle {
                    stroke: color.clone(),
                    stroke_width: settings.stroke_width,
                }),
                animated: settings.animated,
                marker_end: settings.marker_end_type.marker().map(|kind| MarkerEnd {
                    kind,
                    width: settings.marker_size,
                    height: settings.marker_size,
                    color: color.clone(),
                }),
                data: Some(data),
                ..edge.clone()
            }
        })
        .collect()
}
