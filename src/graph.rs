use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Top-left canvas coordinate of a node, or a centre point coming out of the layout engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Side of a node's bounding box an edge attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Top,
    Bottom,
    Left,
    Right,
}

impl HandlePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlePosition::Top => "top",
            HandlePosition::Bottom => "bottom",
            HandlePosition::Left => "left",
            HandlePosition::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    Source,
    Target,
}

/// Named attachment point exposed by the card node renderer.
///
/// Layout output and the renderer agree on these identifiers, so edges only
/// ever carry values produced from this type (`"right-source"`, `"top-target"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    pub side: HandlePosition,
    pub kind: HandleKind,
}

impl HandleId {
    pub const TOP_TARGET: HandleId = HandleId::new(HandlePosition::Top, HandleKind::Target);
    pub const TOP_SOURCE: HandleId = HandleId::new(HandlePosition::Top, HandleKind::Source);
    pub const BOTTOM_TARGET: HandleId = HandleId::new(HandlePosition::Bottom, HandleKind::Target);
    pub const BOTTOM_SOURCE: HandleId = HandleId::new(HandlePosition::Bottom, HandleKind::Source);
    pub const LEFT_TARGET: HandleId = HandleId::new(HandlePosition::Left, HandleKind::Target);
    pub const LEFT_SOURCE: HandleId = HandleId::new(HandlePosition::Left, HandleKind::Source);
    pub const RIGHT_TARGET: HandleId = HandleId::new(HandlePosition::Right, HandleKind::Target);
    pub const RIGHT_SOURCE: HandleId = HandleId::new(HandlePosition::Right, HandleKind::Source);

    pub const fn new(side: HandlePosition, kind: HandleKind) -> Self {
        Self { side, kind }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (side, kind) = raw.trim().split_once('-')?;
        let side = match side {
            "top" => HandlePosition::Top,
            "bottom" => HandlePosition::Bottom,
            "left" => HandlePosition::Left,
            "right" => HandlePosition::Right,
            _ => return None,
        };
        let kind = match kind {
            "source" => HandleKind::Source,
            "target" => HandleKind::Target,
            _ => return None,
        };
        Some(Self { side, kind })
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            HandleKind::Source => "source",
            HandleKind::Target => "target",
        };
        write!(f, "{}-{}", self.side.as_str(), kind)
    }
}

impl Serialize for HandleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HandleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HandleId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown handle identifier '{raw}'")))
    }
}

/// A card placed on the idea map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub position: Point,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandlePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandlePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, position: Point) -> Self {
        Self {
            id: id.into(),
            position,
            kind: None,
            data: None,
            target_position: None,
            source_position: None,
            width: None,
            height: None,
            selected: false,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerType {
    Arrow,
    #[serde(rename = "arrowclosed")]
    ArrowClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerEnd {
    #[serde(rename = "type")]
    pub kind: MarkerType,
    pub width: f32,
    pub height: f32,
    pub color: String,
}

/// A connector between two cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<EdgeStyle>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<MarkerEnd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind: None,
            style: None,
            animated: false,
            marker_end: None,
            data: None,
            selected: false,
        }
    }

    pub fn with_handles(mut self, source: HandleId, target: HandleId) -> Self {
        self.source_handle = Some(source);
        self.target_handle = Some(target);
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Pan offset and zoom of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handle_ids_use_renderer_names() {
        assert_eq!(HandleId::RIGHT_SOURCE.to_string(), "right-source");
        assert_eq!(HandleId::TOP_TARGET.to_string(), "top-target");
        assert_eq!(HandleId::parse("bottom-source"), Some(HandleId::BOTTOM_SOURCE));
        assert_eq!(HandleId::parse("middle-source"), None);
        assert_eq!(HandleId::parse("left"), None);
    }

    #[test]
    fn edge_serializes_camel_case() {
        let edge = Edge::new("e1", "a", "b").with_handles(HandleId::RIGHT_SOURCE, HandleId::LEFT_TARGET);
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value["sourceHandle"], json!("right-source"));
        assert_eq!(value["targetHandle"], json!("left-target"));
        assert!(value.get("markerEnd").is_none());
    }

    #[test]
    fn node_deserializes_minimal_payload() {
        let node: Node = serde_json::from_value(json!({
            "id": "card-1",
            "position": { "x": 10.0, "y": 20.0 },
            "targetPosition": "left"
        }))
        .unwrap();
        assert_eq!(node.position, Point::new(10.0, 20.0));
        assert_eq!(node.target_position, Some(HandlePosition::Left));
        assert!(node.source_position.is_none());
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let result: Result<Edge, _> = serde_json::from_value(json!({
            "id": "e1",
            "source": "a",
            "target": "b",
            "sourceHandle": "nowhere"
        }));
        assert!(result.is_err());
    }
}
