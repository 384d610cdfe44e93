use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::MarkerType;

/// How the in-progress connection line is drawn while the user drags a new edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionLineType {
    #[default]
    Default,
    Straight,
    Step,
    #[serde(rename = "smoothstep")]
    SmoothStep,
    #[serde(rename = "simplebezier")]
    SimpleBezier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerEndType {
    Arrow,
    #[default]
    #[serde(rename = "arrowclosed")]
    ArrowClosed,
    None,
}

impl MarkerEndType {
    pub fn marker(&self) -> Option<MarkerType> {
        match self {
            MarkerEndType::Arrow => Some(MarkerType::Arrow),
            MarkerEndType::ArrowClosed => Some(MarkerType::ArrowClosed),
            MarkerEndType::None => None,
        }
    }
}

/// Per-user visual preferences of the idea-map canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardSettings {
    pub snap_to_grid: bool,
    pub snap_grid: [f32; 2],
    pub connection_line_type: ConnectionLineType,
    pub marker_end_type: MarkerEndType,
    pub stroke_width: f32,
    pub marker_size: f32,
    pub edge_color: String,
    pub selected_edge_color: String,
    pub animated: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            snap_to_grid: true,
            snap_grid: [15.0, 15.0],
            connection_line_type: ConnectionLineType::SmoothStep,
            marker_end_type: MarkerEndType::ArrowClosed,
            stroke_width: 2.0,
            marker_size: 20.0,
            edge_color: "#b1b1b7".to_string(),
            selected_edge_color: "#ff0072".to_string(),
            animated: false,
        }
    }
}

/// A partial settings update. Only the provided fields are sent and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_to_grid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_grid: Option<[f32; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_line_type: Option<ConnectionLineType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end_type: Option<MarkerEndType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_edge_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl BoardSettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The provided fields as a JSON object, keyed by their wire names.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        }
    }
}

impl BoardSettings {
    pub fn apply(&mut self, patch: &BoardSettingsPatch) {
        if let Some(value) = patch.snap_to_grid {
            self.snap_to_grid = value;
        }
        if let Some(value) = patch.snap_grid {
            self.snap_grid = value;
        }
        if let Some(value) = patch.connection_line_type {
            self.connection_line_type = value;
        }
        if let Some(value) = patch.marker_end_type {
            self.marker_end_type = value;
        }
        if let Some(value) = patch.stroke_width {
            self.stroke_width = value;
        }
        if let Some(value) = patch.marker_size {
            self.marker_size = value;
        }
        if let Some(value) = &patch.edge_color {
            self.edge_color = value.clone();
        }
        if let Some(value) = &patch.selected_edge_color {
            self.selected_edge_color = value.clone();
        }
        if let Some(value) = patch.animated {
            self.animated = value;
        }
    }

    pub fn merged(mut self, patch: &BoardSettingsPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// Shallow merge of `patch` over a stored settings object. Keys outside the
/// patch, including ones this version does not know, are kept as stored.
pub fn merge_fields(base: &mut Map<String, Value>, patch: &BoardSettingsPatch) {
    for (key, value) in patch.to_fields() {
        base.insert(key, value);
    }
}
