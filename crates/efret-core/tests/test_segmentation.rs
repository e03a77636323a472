#[allow(dead_code)]
mod common;

use ndarray::Array2;

use efret_core::frame::Channel;
use efret_core::segmentation::components::remove_small_components;
use efret_core::segmentation::morphology::{closing, dilate, erode, opening, Footprint};
use efret_core::segmentation::{
    bleach_segmentation, calibration_segmentation, label_components, refine_mask, Connectivity,
    SegmentationConfig,
};

use common::{bleach_pair_stacks, small_segmentation, CENTRE_DISK, TWO_DISKS};

fn square(mask: &mut Array2<bool>, row: usize, col: usize, side: usize) {
    for r in row..row + side {
        for c in col..col + side {
            mask[[r, c]] = true;
        }
    }
}

#[test]
fn test_labels_in_raster_order() {
    let mut mask = Array2::from_elem((20, 20), false);
    square(&mut mask, 12, 2, 3);
    square(&mut mask, 2, 14, 3);
    square(&mut mask, 2, 2, 3);

    let labels = label_components(&mask, Connectivity::Eight);
    assert_eq!(labels.count(), 3);
    assert_eq!(labels.labels()[[2, 2]], 1);
    assert_eq!(labels.labels()[[2, 14]], 2);
    assert_eq!(labels.labels()[[12, 2]], 3);
    assert_eq!(labels.areas(), vec![9, 9, 9]);
}

#[test]
fn test_u_shape_is_one_region() {
    // Two arms joined only at the bottom: the right arm gets a provisional
    // label first on row 0 but must merge into region 1.
    let mut mask = Array2::from_elem((6, 6), false);
    for r in 0..5 {
        mask[[r, 0]] = true;
        mask[[r, 4]] = true;
    }
    for c in 0..5 {
        mask[[4, c]] = true;
    }
    let labels = label_components(&mask, Connectivity::Four);
    assert_eq!(labels.count(), 1);
    assert!(labels.labels().iter().all(|&l| l <= 1));
}

#[test]
fn test_diagonal_connectivity() {
    let mut mask = Array2::from_elem((4, 4), false);
    mask[[0, 0]] = true;
    mask[[1, 1]] = true;
    mask[[2, 2]] = true;

    assert_eq!(label_components(&mask, Connectivity::Eight).count(), 1);
    assert_eq!(label_components(&mask, Connectivity::Four).count(), 3);
}

#[test]
fn test_region_areas() {
    let mut mask = Array2::from_elem((10, 10), false);
    square(&mut mask, 1, 3, 2);
    square(&mut mask, 6, 6, 4);
    let labels = label_components(&mask, Connectivity::Eight);
    assert_eq!(labels.areas(), vec![4, 16]);
    assert_eq!(labels.labels()[[1, 3]], 1);
    assert_eq!(labels.labels()[[9, 9]], 2);
}

#[test]
fn test_comb_merges_into_one_region() {
    // Teeth hang down from a spine along the bottom row, so every tooth gets
    // its own provisional label and they only merge on the last row.
    let (h, w) = (200, 199);
    let mut mask = Array2::from_elem((h, w), false);
    for col in (0..w).step_by(2) {
        for row in 0..h {
            mask[[row, col]] = true;
        }
    }
    for col in 0..w {
        mask[[h - 1, col]] = true;
    }

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let labels = label_components(&mask, connectivity);
        assert_eq!(labels.count(), 1);
        assert_eq!(labels.areas()[0], mask.iter().filter(|&&m| m).count());
    }
}

#[test]
fn test_staircase_chain_keeps_raster_order() {
    // A 50-step staircase that chains one provisional label per row, below
    // an isolated block found first in raster order.
    let mut mask = Array2::from_elem((60, 60), false);
    square(&mut mask, 0, 50, 3);
    for step in 0..50 {
        mask[[step + 5, 49 - step]] = true;
        mask[[step + 5, 48 - step.min(48)]] = true;
    }
    let labels = label_components(&mask, Connectivity::Four);
    assert_eq!(labels.count(), 2);
    assert_eq!(labels.labels()[[0, 50]], 1);
    assert_eq!(labels.labels()[[5, 49]], 2);
    assert_eq!(labels.labels()[[54, 0]], 2);
}

#[test]
fn test_remove_small_components() {
    let mut mask = Array2::from_elem((10, 10), false);
    square(&mut mask, 0, 0, 2);
    square(&mut mask, 5, 5, 4);
    let cleaned = remove_small_components(&mask, 5, Connectivity::Eight);
    assert!(!cleaned[[0, 0]]);
    assert!(cleaned[[6, 6]]);
    assert_eq!(cleaned.iter().filter(|&&m| m).count(), 16);
}

#[test]
fn test_erode_ignores_outside() {
    // A full mask stays full: pixels past the border never erode it.
    let mask = Array2::from_elem((8, 8), true);
    let eroded = erode(&mask, &Footprint::disk(2));
    assert!(eroded.iter().all(|&m| m));
}

#[test]
fn test_dilate_then_erode_square() {
    let mut mask = Array2::from_elem((15, 15), false);
    square(&mut mask, 5, 5, 5);

    let dilated = dilate(&mask, &Footprint::disk(1));
    assert_eq!(dilated.iter().filter(|&&m| m).count(), 25 + 4 * 5);

    let eroded = erode(&mask, &Footprint::disk(1));
    assert_eq!(eroded.iter().filter(|&&m| m).count(), 9);
}

#[test]
fn test_closing_fills_gap_opening_removes_speck() {
    let mut mask = Array2::from_elem((15, 15), false);
    square(&mut mask, 4, 2, 5);
    square(&mut mask, 4, 8, 5);
    // One-pixel gap at column 7 between the two squares.
    let closed = closing(&mask, &Footprint::disk(1));
    assert!(closed[[6, 7]]);

    let mut specks = mask.clone();
    specks[[0, 14]] = true;
    let opened = opening(&specks, &Footprint::disk(1));
    assert!(!opened[[0, 14]]);
    assert!(opened[[6, 4]]);
}

#[test]
fn test_calibration_segmentation_single_cell() {
    let (pre, _) = bleach_pair_stacks(&[CENTRE_DISK], 2, &[2.0]);
    let reference = pre.mean_image(Channel::AA);
    let seg = calibration_segmentation(&reference, &SegmentationConfig::default());

    assert_eq!(seg.labels.count(), 1);
    assert!(seg.mask[[32, 32]]);
    assert!(!seg.mask[[0, 0]]);
    // Radius 20 eroded by 10 leaves roughly a radius-10 disk.
    assert!(!seg.mask[[32, 45]]);
    assert_eq!(seg.labels.foreground(), seg.mask);
}

#[test]
fn test_calibration_segmentation_blank_image() {
    let reference = Array2::<f32>::zeros((32, 32));
    let seg = calibration_segmentation(&reference, &SegmentationConfig::default());
    assert!(seg.labels.is_empty());
    assert!(seg.mask.iter().all(|&m| !m));
}

#[test]
fn test_bleach_segmentation_masks_nest() {
    let (pre, _) = bleach_pair_stacks(&TWO_DISKS, 2, &[2.0, 2.0]);
    let reference = pre.mean_image(Channel::AA);
    let seg = bleach_segmentation(&reference, &small_segmentation());

    assert_eq!(seg.labels.count(), 2);
    assert_eq!(seg.labels.labels()[[20, 20]], 1);
    assert_eq!(seg.labels.labels()[[44, 44]], 2);
    // Every narrow-mask pixel lies in the wide mask, which reaches further.
    assert!(seg
        .mask
        .iter()
        .zip(seg.wide_mask.iter())
        .all(|(&narrow, &wide)| !narrow || wide));
    assert!(seg.wide_mask[[20, 35]]);
    assert!(!seg.mask[[20, 35]]);
    assert!(!seg.wide_mask[[0, 63]]);
}

#[test]
fn test_refine_mask_extension() {
    let (pre, _) = bleach_pair_stacks(&[CENTRE_DISK], 1, &[2.0]);
    let reference = pre.mean_image(Channel::AA);
    let config = small_segmentation();

    let plain = refine_mask(&reference, false, 0, &config);
    let extended = refine_mask(&reference, true, 5, &config);
    let count = |m: &Array2<bool>| m.iter().filter(|&&v| v).count();
    assert!(count(&extended) > count(&plain));
    assert!(plain[[32, 32]]);
    assert!(!plain[[32, 55]]);
    assert!(extended[[32, 55]]);
}

#[test]
fn test_segmentation_is_deterministic() {
    let (pre, _) = bleach_pair_stacks(&TWO_DISKS, 3, &[2.0, 3.0]);
    let reference = pre.mean_image(Channel::AA);
    let config = small_segmentation();
    let a = bleach_segmentation(&reference, &config);
    let b = bleach_segmentation(&reference, &config);
    assert_eq!(a.mask, b.mask);
    assert_eq!(a.wide_mask, b.wide_mask);
    assert_eq!(a.labels, b.labels);
}
