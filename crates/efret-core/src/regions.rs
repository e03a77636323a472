use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};
use num_traits::AsPrimitive;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::segmentation::LabelMap;

/// Per-region, per-frame intensity statistics of an image series.
#[derive(Clone, Debug)]
pub struct RegionProfiles {
    /// Region ids, one per row of `means`/`sds`.
    pub labels: Vec<u32>,
    /// Mean pixel value, shape (regions, frames). NaN when a region has no
    /// finite pixel in a frame.
    pub means: Array2<f64>,
    /// Population standard deviation, same shape and NaN convention.
    pub sds: Array2<f64>,
}

impl RegionProfiles {
    pub fn region_count(&self) -> usize {
        self.labels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.means.ncols()
    }

    /// Mean profile of a single region.
    pub fn profile(&self, id: u32) -> Option<ArrayView1<'_, f64>> {
        let row = self.labels.iter().position(|&l| l == id)?;
        Some(self.means.row(row))
    }

    /// Average of the region means in each frame, skipping NaN regions.
    ///
    /// A frame where no region has a finite mean is NaN.
    pub fn mean_over_regions(&self) -> Vec<f64> {
        self.means
            .axis_iter(Axis(1))
            .map(|column| {
                let (sum, n) = column
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
                if n > 0 {
                    sum / n as f64
                } else {
                    f64::NAN
                }
            })
            .collect()
    }
}

#[derive(Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    sum_sq: f64,
    count: u64,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        if v.is_finite() {
            self.sum += v;
            self.sum_sq += v * v;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }

    fn sd(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

fn frame_accumulators<T>(labels: &Array2<u32>, regions: usize, frame: ArrayView2<T>) -> Vec<Accumulator>
where
    T: Copy + AsPrimitive<f64>,
{
    let mut acc = vec![Accumulator::default(); regions];
    for (&l, &v) in labels.iter().zip(frame.iter()) {
        if l > 0 {
            acc[l as usize - 1].push(v.as_());
        }
    }
    acc
}

/// Per-region, per-frame mean and standard deviation of `series` under
/// every positive label. Background (label 0) is excluded and non-finite
/// pixels are skipped.
///
/// `series` must be shaped (frames, height, width) with the label map's
/// spatial dimensions.
pub fn label_profiles<T>(labels: &LabelMap, series: &Array3<T>) -> RegionProfiles
where
    T: Copy + Send + Sync + AsPrimitive<f64>,
{
    let regions = labels.count();
    let frames = series.len_of(Axis(0));
    let map = labels.labels();

    let per_frame: Vec<Vec<Accumulator>> = if frames >= PARALLEL_FRAME_THRESHOLD {
        series
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|frame| frame_accumulators(map, regions, frame))
            .collect()
    } else {
        series
            .axis_iter(Axis(0))
            .map(|frame| frame_accumulators(map, regions, frame))
            .collect()
    };

    let mut means = Array2::<f64>::from_elem((regions, frames), f64::NAN);
    let mut sds = Array2::<f64>::from_elem((regions, frames), f64::NAN);
    for (f, acc) in per_frame.iter().enumerate() {
        for (r, a) in acc.iter().enumerate() {
            means[[r, f]] = a.mean();
            sds[[r, f]] = a.sd();
        }
    }

    RegionProfiles {
        labels: labels.ids().collect(),
        means,
        sds,
    }
}

/// Mean of `series` over the true pixels of `mask`, one value per frame.
pub fn masked_mean_profile<T>(mask: &Array2<bool>, series: &Array3<T>) -> Vec<f64>
where
    T: Copy + AsPrimitive<f64>,
{
    series
        .axis_iter(Axis(0))
        .map(|frame| {
            let mut acc = Accumulator::default();
            for (&m, &v) in mask.iter().zip(frame.iter()) {
                if m {
                    acc.push(v.as_());
                }
            }
            acc.mean()
        })
        .collect()
}

/// Pixel values of one region in one frame, in raster order.
pub fn region_pixel_values<T>(labels: &LabelMap, id: u32, frame: ArrayView2<T>) -> Vec<f64>
where
    T: Copy + AsPrimitive<f64>,
{
    labels
        .labels()
        .iter()
        .zip(frame.iter())
        .filter(|(l, _)| **l == id)
        .map(|(_, &v)| v.as_())
        .collect()
}

/// A labeled per-frame profile, the data behind a line plot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedProfile {
    pub name: String,
    pub values: Vec<f64>,
}

impl NamedProfile {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Paired samples pooled across regions, grouped region by region.
#[derive(Clone, Debug, Default)]
pub struct PooledSamples {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Regions that contributed at least one pair.
    pub regions_used: Vec<u32>,
    /// Regions left without any pair after filtering.
    pub regions_dropped: Vec<u32>,
}

impl PooledSamples {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append one region's pairs, recording it as used or dropped.
    pub fn push_region(&mut self, id: u32, x: Vec<f64>, y: Vec<f64>) {
        if x.is_empty() {
            self.regions_dropped.push(id);
        } else {
            self.x.extend(x);
            self.y.extend(y);
            self.regions_used.push(id);
        }
    }
}

/// Pool (x, y) pixel pairs of one frame over every region not listed in
/// `excluded`, keeping only pairs accepted by `keep`.
pub fn pool_region_pixels<X, Y, F>(
    labels: &LabelMap,
    x: ArrayView2<X>,
    y: ArrayView2<Y>,
    excluded: &[u32],
    keep: F,
) -> PooledSamples
where
    X: Copy + AsPrimitive<f64>,
    Y: Copy + AsPrimitive<f64>,
    F: Fn(f64, f64) -> bool,
{
    let mut per_region: Vec<(Vec<f64>, Vec<f64>)> = vec![(Vec::new(), Vec::new()); labels.count()];
    for ((&l, &xv), &yv) in labels.labels().iter().zip(x.iter()).zip(y.iter()) {
        if l == 0 || excluded.contains(&l) {
            continue;
        }
        let (xv, yv): (f64, f64) = (xv.as_(), yv.as_());
        if keep(xv, yv) {
            let entry = &mut per_region[l as usize - 1];
            entry.0.push(xv);
            entry.1.push(yv);
        }
    }

    let mut pooled = PooledSamples::default();
    for (id, (xs, ys)) in labels.ids().zip(per_region) {
        if !excluded.contains(&id) {
            pooled.push_region(id, xs, ys);
        }
    }
    pooled
}
