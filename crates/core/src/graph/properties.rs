use serde::{Deserialize, Serialize};

use crate::models::GraphNode;

/// Smallest node size; every node stays visible.
pub const MIN_NODE_SIZE: f64 = 0.5;
/// Hours of playtime per unit of size growth.
pub const PLAYTIME_SIZE_DIVISOR: f64 = 400.0;
/// Ceiling on size growth above [`MIN_NODE_SIZE`].
pub const SIZE_CAP: f64 = 1.5;
/// Recent hours that saturate the glow.
pub const RECENT_NORMALIZER: f64 = 20.0;
/// Orbit of a fully glowing node.
pub const ORBIT_BASE: f64 = 3.0;
/// Extra orbit distance for a dormant node.
pub const ORBIT_SPREAD: f64 = 4.0;

/// Visual scalars for a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    /// Rendered size; grows with lifetime playtime.
    pub size: f64,
    /// Glow in `[0, 1]`; grows with recent playtime.
    pub glow_intensity: f64,
    /// Distance from the core; shrinks with recent playtime.
    pub orbit_distance: f64,
}

/// Tunable constants for mapping playtime onto visuals.
///
/// Size is a linear ramp clamped at a ceiling, glow is recent hours
/// normalised into `[0, 1]`, and orbit distance falls as glow rises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    /// Floor size for unplayed games.
    pub min_size: f64,
    /// Playtime hours per unit of size.
    pub size_divisor: f64,
    /// Maximum size added on top of the floor.
    pub size_cap: f64,
    /// Recent hours at which glow saturates.
    pub recent_normalizer: f64,
    /// Orbit for the most active games.
    pub orbit_base: f64,
    /// Orbit added for fully dormant games.
    pub orbit_spread: f64,
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self {
            min_size: MIN_NODE_SIZE,
            size_divisor: PLAYTIME_SIZE_DIVISOR,
            size_cap: SIZE_CAP,
            recent_normalizer: RECENT_NORMALIZER,
            orbit_base: ORBIT_BASE,
            orbit_spread: ORBIT_SPREAD,
        }
    }
}

impl NodeLayout {
    /// Compute size, glow and orbit for a node.
    pub fn properties(&self, node: &GraphNode) -> NodeProperties {
        let size = self.min_size + self.size_growth(node.playtime_hours);
        let glow_intensity = ratio(node.recent_hours, self.recent_normalizer).min(1.0);
        let orbit_distance = self.orbit_base + (1.0 - glow_intensity) * self.orbit_spread;
        NodeProperties {
            size,
            glow_intensity,
            orbit_distance,
        }
    }

    /// Playtime weight in `[0, 1]` on the same ramp as the size.
    pub fn importance(&self, node: &GraphNode) -> f64 {
        if self.size_cap <= 0.0 {
            return 0.0;
        }
        (self.size_growth(node.playtime_hours) / self.size_cap).clamp(0.0, 1.0)
    }

    fn size_growth(&self, playtime_hours: f64) -> f64 {
        ratio(playtime_hours, self.size_divisor).min(self.size_cap.max(0.0))
    }
}

/// Visual scalars with the default constants.
pub fn calculate_node_properties(node: &GraphNode) -> NodeProperties {
    NodeLayout::default().properties(node)
}

// Non-positive, NaN or zero-divisor inputs map to 0.
fn ratio(value: f64, divisor: f64) -> f64 {
    if value.is_nan() || value <= 0.0 || divisor <= 0.0 {
        0.0
    } else {
        value / divisor
    }
}
