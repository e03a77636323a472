use ndarray::Array2;
use tracing::debug;

use super::components::{label_components, LabelMap};
use super::config::SegmentationConfig;
use super::morphology::{closing, erode, opening, Footprint};
use super::refine::refine_mask;
use super::threshold::{binarize, otsu_threshold};

/// Cell mask and its labeled regions.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub mask: Array2<bool>,
    pub labels: LabelMap,
}

/// Two-tier mask of a bleach pair.
#[derive(Clone, Debug)]
pub struct BleachSegmentation {
    /// Cells plus a dilated margin; everything outside is background.
    pub wide_mask: Array2<bool>,
    /// Cell bodies used for every quantitative aggregation.
    pub mask: Array2<bool>,
    pub labels: LabelMap,
}

/// Calibration mask: Otsu -> closing -> erosion -> labeling.
pub fn calibration_segmentation(reference: &Array2<f32>, config: &SegmentationConfig) -> Segmentation {
    let threshold = otsu_threshold(reference);
    let raw = binarize(reference, threshold);
    let closed = closing(&raw, &Footprint::disk(config.closing_radius));
    let mask = erode(&closed, &Footprint::disk(config.erosion_radius));
    let labels = label_components(&mask, config.connectivity);
    debug!(threshold, regions = labels.count(), "Calibration segmentation");
    Segmentation { mask, labels }
}

/// Bleach-pair masks: a wide refined mask with extension, and a narrow mask
/// refined further by opening -> erosion -> opening before labeling.
pub fn bleach_segmentation(reference: &Array2<f32>, config: &SegmentationConfig) -> BleachSegmentation {
    let wide_mask = refine_mask(reference, true, config.extension_radius, config);
    let narrow = refine_mask(reference, false, 0, config);

    let opened = opening(&narrow, &Footprint::disk(config.opening_radius));
    let eroded = erode(&opened, &Footprint::disk(config.erosion_radius));
    let mask = opening(&eroded, &Footprint::disk(config.final_opening_radius));

    let labels = label_components(&mask, config.connectivity);
    debug!(regions = labels.count(), "Bleach-pair segmentation");
    BleachSegmentation {
        wide_mask,
        mask,
        labels,
    }
}
