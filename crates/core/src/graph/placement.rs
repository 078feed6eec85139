use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::models::GraphNode;

use super::properties::{NodeLayout, NodeProperties};

const BASE_ORBIT: f64 = 2.0;
const ORBIT_STEP: f64 = 1.2;
const ANGLE_TWIST: f64 = 0.35;
const BAND_COUNT: usize = 10;
const BAND_HEIGHT: f64 = 0.9;
const BAND_WAVE: f64 = 0.3;
const DEPTH_SQUASH: f64 = 0.6;

/// Scene position of a node alongside its visual properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    /// App id of the placed node.
    pub id: u32,
    /// `[x, y, z]` in scene units.
    pub position: [f64; 3],
    /// Size, glow and orbit used to draw the node.
    pub properties: NodeProperties,
}

/// Lay nodes out on a widening spiral, in the order given.
///
/// Node `i` sits on radius `2 + 1.2 i + 2 size` at an angle that advances
/// around the circle with a small per-index twist; heights cycle through
/// ten bands so neighbours do not overlap.
pub fn place_nodes(nodes: &[GraphNode]) -> Vec<NodePlacement> {
    place_nodes_with(&NodeLayout::default(), nodes)
}

/// [`place_nodes`] with custom property constants.
pub fn place_nodes_with(layout: &NodeLayout, nodes: &[GraphNode]) -> Vec<NodePlacement> {
    let count = nodes.len().max(1) as f64;
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let properties = layout.properties(node);
            let i = index as f64;
            let radius = BASE_ORBIT + i * ORBIT_STEP + properties.size * 2.0;
            let angle = i / count * TAU + i * ANGLE_TWIST;
            let band = (index % BAND_COUNT) as f64;
            let y = (band - (BAND_COUNT - 1) as f64 / 2.0) * BAND_HEIGHT
                + (angle * 1.3).sin() * BAND_WAVE;

            NodePlacement {
                id: node.id,
                position: [
                    angle.cos() * radius,
                    y,
                    angle.sin() * radius * DEPTH_SQUASH,
                ],
                properties,
            }
        })
        .collect()
}
