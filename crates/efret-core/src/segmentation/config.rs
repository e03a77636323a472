use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CLOSING_RADIUS, DEFAULT_EROSION_RADIUS, DEFAULT_EXTENSION_RADIUS,
    DEFAULT_FINAL_OPENING_RADIUS, DEFAULT_MIN_REGION_AREA, DEFAULT_OPENING_RADIUS,
    DEFAULT_REFINE_BLUR_SIGMA,
};

/// Pixel adjacency used when labeling connected regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and corner neighbours.
    #[default]
    Eight,
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Four => write!(f, "4-connected"),
            Self::Eight => write!(f, "8-connected"),
        }
    }
}

/// Structuring-element radii and refinement parameters for cell masks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Disk radius of the closing applied to calibration masks.
    #[serde(default = "default_closing_radius")]
    pub closing_radius: usize,
    /// Disk radius of the erosion step (both mask pipelines).
    #[serde(default = "default_erosion_radius")]
    pub erosion_radius: usize,
    /// Disk radius of the first opening of the narrow bleach mask.
    #[serde(default = "default_opening_radius")]
    pub opening_radius: usize,
    /// Disk radius of the last opening of the narrow bleach mask.
    #[serde(default = "default_final_opening_radius")]
    pub final_opening_radius: usize,
    /// Dilation radius of the wide bleach mask.
    #[serde(default = "default_extension_radius")]
    pub extension_radius: usize,
    /// Gaussian sigma applied before thresholding during refinement.
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
    /// Refinement drops connected components smaller than this (pixels).
    #[serde(default = "default_min_region_area")]
    pub min_region_area: usize,
    #[serde(default)]
    pub connectivity: Connectivity,
}

fn default_closing_radius() -> usize {
    DEFAULT_CLOSING_RADIUS
}
fn default_erosion_radius() -> usize {
    DEFAULT_EROSION_RADIUS
}
fn default_opening_radius() -> usize {
    DEFAULT_OPENING_RADIUS
}
fn default_final_opening_radius() -> usize {
    DEFAULT_FINAL_OPENING_RADIUS
}
fn default_extension_radius() -> usize {
    DEFAULT_EXTENSION_RADIUS
}
fn default_blur_sigma() -> f32 {
    DEFAULT_REFINE_BLUR_SIGMA
}
fn default_min_region_area() -> usize {
    DEFAULT_MIN_REGION_AREA
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            closing_radius: DEFAULT_CLOSING_RADIUS,
            erosion_radius: DEFAULT_EROSION_RADIUS,
            opening_radius: DEFAULT_OPENING_RADIUS,
            final_opening_radius: DEFAULT_FINAL_OPENING_RADIUS,
            extension_radius: DEFAULT_EXTENSION_RADIUS,
            blur_sigma: DEFAULT_REFINE_BLUR_SIGMA,
            min_region_area: DEFAULT_MIN_REGION_AREA,
            connectivity: Connectivity::default(),
        }
    }
}
