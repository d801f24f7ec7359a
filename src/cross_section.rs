//! Waveguide Cross-Sections

use serde::{Deserialize, Serialize};

use crate::geometry::Layer;

/// Profile a routed path is rendered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub name: String,
    pub width: f64,
    pub layer: Layer,
}

impl CrossSection {
    /// Single-core strip waveguide.
    pub fn strip(width: f64, layer: Layer) -> Self {
        Self {
            name: "strip".to_string(),
            width,
            layer,
        }
    }
}

impl Default for CrossSection {
    fn default() -> Self {
        Self::strip(0.5, Layer::WG)
    }
}
