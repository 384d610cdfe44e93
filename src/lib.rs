pub mod board;
#[cfg(feature = "server")]
pub mod database;
pub mod edge_style;
pub mod graph;
pub mod layout;
pub mod persistence;
pub mod remote;
#[cfg(feature = "server")]
pub mod serve;
pub mod settings;
pub mod storage;
#[cfg(feature = "server")]
pub mod user_settings;

pub use board::{Board, BoardError, BoardSnapshot};
pub use edge_style::{EDGE_TYPE, apply_edge_style};
pub use graph::{Edge, EdgeStyle, HandleId, HandleKind, HandlePosition, MarkerEnd, MarkerType, Node, Point, Viewport};
pub use layout::{LayoutDirection, LayoutError, directed_layout, grid_layout};
pub use persistence::{SettingsError, SettingsPersistence};
pub use remote::{HttpSettingsRemote, RemoteConfig, RemoteError, SettingsRemote};
pub use settings::{BoardSettings, BoardSettingsPatch, ConnectionLineType, MarkerEndType};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
