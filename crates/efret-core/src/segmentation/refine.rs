use ndarray::Array2;
use tracing::debug;

use crate::filters::gaussian_blur_array;

use super::components::remove_small_components;
use super::config::SegmentationConfig;
use super::morphology::{dilate, fill_holes, Footprint};
use super::threshold::{binarize, otsu_threshold};

/// Cell mask from a representative image.
///
/// Pipeline: Gaussian blur -> Otsu threshold -> hole filling -> small-region
/// removal -> optional dilation by `extension_radius` (the extended mask
/// covers the cells plus a margin and marks what is *not* background).
pub fn refine_mask(
    image: &Array2<f32>,
    extend: bool,
    extension_radius: usize,
    config: &SegmentationConfig,
) -> Array2<bool> {
    let blurred = gaussian_blur_array(image, config.blur_sigma);
    let threshold = otsu_threshold(&blurred);
    debug!(threshold, extend, "Refining mask");

    let raw = binarize(&blurred, threshold);
    let filled = fill_holes(&raw);
    let cleaned = remove_small_components(&filled, config.min_region_area, config.connectivity);

    if extend && extension_radius > 0 {
        dilate(&cleaned, &Footprint::disk(extension_radius))
    } else {
        cleaned
    }
}
