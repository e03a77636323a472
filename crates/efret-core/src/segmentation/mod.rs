pub mod components;
pub mod config;
pub mod masks;
pub mod morphology;
pub mod refine;
pub mod threshold;

pub use components::{label_components, LabelMap};
pub use config::{Connectivity, SegmentationConfig};
pub use masks::{bleach_segmentation, calibration_segmentation, BleachSegmentation, Segmentation};
pub use refine::refine_mask;
