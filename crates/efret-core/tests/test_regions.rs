use ndarray::{Array2, Array3};

use efret_core::regions::{
    label_profiles, masked_mean_profile, pool_region_pixels, region_pixel_values,
};
use efret_core::segmentation::{label_components, Connectivity, LabelMap};

/// Two 2x2 regions in a 6x6 field: region 1 top-left, region 2 bottom-right.
fn two_regions() -> LabelMap {
    let mut mask = Array2::from_elem((6, 6), false);
    for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1), (4, 4), (4, 5), (5, 4), (5, 5)] {
        mask[[r, c]] = true;
    }
    label_components(&mask, Connectivity::Eight)
}

#[test]
fn test_label_profiles_mean_and_sd() {
    let labels = two_regions();
    let mut series = Array3::<f32>::from_elem((2, 6, 6), 99.0);
    // Region 1, frame 0: 1, 2, 3, 4 -> mean 2.5, population sd sqrt(1.25).
    series[[0, 0, 0]] = 1.0;
    series[[0, 0, 1]] = 2.0;
    series[[0, 1, 0]] = 3.0;
    series[[0, 1, 1]] = 4.0;
    // Region 2, frame 1: constant 7.
    for (r, c) in [(4, 4), (4, 5), (5, 4), (5, 5)] {
        series[[1, r, c]] = 7.0;
    }

    let profiles = label_profiles(&labels, &series);
    assert_eq!(profiles.labels, vec![1, 2]);
    assert_eq!(profiles.region_count(), 2);
    assert_eq!(profiles.frame_count(), 2);
    assert!((profiles.means[[0, 0]] - 2.5).abs() < 1e-9);
    assert!((profiles.sds[[0, 0]] - 1.25f64.sqrt()).abs() < 1e-9);
    assert!((profiles.means[[1, 1]] - 7.0).abs() < 1e-9);
    assert!(profiles.sds[[1, 1]].abs() < 1e-9);
    // Background pixels (99) never leak into a region.
    assert!((profiles.means[[1, 0]] - 99.0).abs() < 1e-9);
    assert_eq!(profiles.profile(2).unwrap().len(), 2);
    assert!(profiles.profile(3).is_none());
}

#[test]
fn test_label_profiles_skip_nan() {
    let labels = two_regions();
    let mut series = Array3::<f32>::from_elem((1, 6, 6), 4.0);
    series[[0, 0, 0]] = f32::NAN;
    for (r, c) in [(4, 4), (4, 5), (5, 4), (5, 5)] {
        series[[0, r, c]] = f32::NAN;
    }

    let profiles = label_profiles(&labels, &series);
    assert!((profiles.means[[0, 0]] - 4.0).abs() < 1e-9);
    assert!(profiles.means[[1, 0]].is_nan());
    // The all-NaN region is left out of the cross-region average.
    assert_eq!(profiles.mean_over_regions(), vec![4.0]);
}

#[test]
fn test_mean_over_regions_all_nan_frame() {
    let labels = two_regions();
    let series = Array3::<f32>::from_elem((1, 6, 6), f32::NAN);
    let profiles = label_profiles(&labels, &series);
    assert!(profiles.mean_over_regions()[0].is_nan());
}

#[test]
fn test_masked_mean_profile() {
    let mut mask = Array2::from_elem((3, 3), false);
    mask[[1, 1]] = true;
    mask[[2, 2]] = true;
    let mut series = Array3::<u16>::zeros((2, 3, 3));
    series[[0, 1, 1]] = 10;
    series[[0, 2, 2]] = 20;
    series[[1, 1, 1]] = 4;
    assert_eq!(masked_mean_profile(&mask, &series), vec![15.0, 2.0]);

    let empty = Array2::from_elem((3, 3), false);
    assert!(masked_mean_profile(&empty, &series)[0].is_nan());
}

#[test]
fn test_region_pixel_values_raster_order() {
    let labels = two_regions();
    let frame = Array2::from_shape_fn((6, 6), |(r, c)| (r * 6 + c) as u16);
    let values = region_pixel_values(&labels, 2, frame.view());
    assert_eq!(values, vec![28.0, 29.0, 34.0, 35.0]);
}

#[test]
fn test_pool_region_pixels_excludes_and_filters() {
    let labels = two_regions();
    let x = Array2::from_shape_fn((6, 6), |(r, c)| (r * 6 + c) as f64);
    let mut y = Array2::<f64>::from_elem((6, 6), 1.0);
    y[[0, 0]] = 0.0;

    let pooled = pool_region_pixels(&labels, x.view(), y.view(), &[], |xv, yv| xv > 0.0 && yv > 0.0);
    assert_eq!(pooled.len(), 7);
    assert_eq!(pooled.regions_used, vec![1, 2]);
    assert!(pooled.regions_dropped.is_empty());
    assert_eq!(&pooled.x[..3], &[1.0, 6.0, 7.0]);

    let without_two = pool_region_pixels(&labels, x.view(), y.view(), &[2], |_, _| true);
    assert_eq!(without_two.len(), 4);
    assert_eq!(without_two.regions_used, vec![1]);
    assert!(without_two.regions_dropped.is_empty());

    let none_kept = pool_region_pixels(&labels, x.view(), y.view(), &[1], |xv, _| xv > 100.0);
    assert!(none_kept.is_empty());
    assert_eq!(none_kept.regions_dropped, vec![2]);
}
