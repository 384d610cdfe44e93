pub mod directed;
pub mod engine;
pub mod grid;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use directed::{NODE_HEIGHT, NODE_WIDTH, directed_layout, directed_layout_with};
pub use engine::{DagreLayout, GraphLayout, GraphOptions, RankDir};
pub use grid::{DEFAULT_CARDS_PER_ROW, grid_layout};

/// Flow direction requested by the "arrange" toolbar action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Ranks flow left to right.
    Horizontal,
    /// Ranks flow top to bottom.
    #[default]
    Vertical,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("edge {from} -> {to} references unknown node '{node}'")]
    UnknownNode {
        node: String,
        from: String,
        to: String,
    },
}
