//! Graph synthesis and node layout.

/// Deterministic colour tokens derived from app ids.
pub mod color;
/// Playtime/recency to visual scalars.
pub mod properties;
/// Orbit placement of nodes in the scene.
pub mod placement;
/// The `{ nodes }` document served to graph consumers.
pub mod response;
/// Owned-game records to graph nodes.
pub mod synthesizer;

pub use color::{color_from_app_id, HslColor};
pub use placement::{place_nodes, NodePlacement};
pub use properties::{calculate_node_properties, NodeLayout, NodeProperties};
pub use response::GraphResponse;
pub use synthesizer::{build_game_graph, build_game_graph_with_rarity, GraphSynthesizer};
