use ndarray::{Array3, ArrayViewMut2, Axis};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{BACKGROUND_PERCENTILE, PARALLEL_FRAME_THRESHOLD};
use crate::frame::ImageStack;

/// Subtract the per-frame background from all four channels of a stack.
pub fn correct_background(stack: ImageStack) -> ImageStack {
    stack.map_channels(subtract_background)
}

/// Per-frame background subtraction for one channel.
///
/// Each frame loses its 1st-percentile intensity; results are clipped at 0
/// and truncated back to u16.
pub fn subtract_background(mut series: Array3<u16>) -> Array3<u16> {
    if series.len_of(Axis(0)) >= PARALLEL_FRAME_THRESHOLD {
        series
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(subtract_frame_background);
    } else {
        series
            .axis_iter_mut(Axis(0))
            .for_each(subtract_frame_background);
    }
    series
}

fn subtract_frame_background(mut frame: ArrayViewMut2<u16>) {
    let mut values: Vec<u16> = frame.iter().copied().collect();
    let level = percentile(&mut values, BACKGROUND_PERCENTILE);
    if level <= 0.0 {
        return;
    }
    debug!(level, "Background level");
    frame.mapv_inplace(|v| (v as f64 - level).max(0.0) as u16);
}

/// Percentile `q` (0..100) with linear interpolation between closest ranks.
///
/// Reorders `values` in place. Returns 0 for an empty slice.
pub fn percentile(values: &mut [u16], q: f64) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;

    let (_, lo_val, upper) = values.select_nth_unstable(lo);
    let lo_val = *lo_val as f64;
    if frac == 0.0 {
        return lo_val;
    }
    let hi_val = upper.iter().min().map_or(lo_val, |&v| v as f64);
    lo_val + frac * (hi_val - lo_val)
}
