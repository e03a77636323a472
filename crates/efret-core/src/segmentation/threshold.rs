use ndarray::Array2;

use crate::consts::OTSU_HISTOGRAM_BINS;

/// Otsu's thresholding over the finite values of `data`.
///
/// The histogram spans [min, max] in [`OTSU_HISTOGRAM_BINS`] bins and the
/// returned value is the centre of the bin that maximizes between-class
/// variance (the first one on ties). A constant image returns its value, so
/// strict `>` binarization yields an empty mask.
pub fn otsu_threshold(data: &Array2<f32>) -> f32 {
    let Some((min, max)) = finite_range(data) else {
        return 0.0;
    };
    if max <= min {
        return min;
    }

    let bins = OTSU_HISTOGRAM_BINS;
    let bin_width = (max - min) as f64 / bins as f64;
    let mut histogram = vec![0u64; bins];
    for &v in data.iter().filter(|v| v.is_finite()) {
        let bin = (((v - min) as f64 / bin_width) as usize).min(bins - 1);
        histogram[bin] += 1;
    }

    let total: f64 = histogram.iter().map(|&c| c as f64).sum();
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0.0_f64;
    let mut sum_bg = 0.0_f64;
    let mut best_variance = 0.0_f64;
    let mut best_bin = 0usize;

    for (i, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += i as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between_variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if between_variance > best_variance {
            best_variance = between_variance;
            best_bin = i;
        }
    }

    (min as f64 + (best_bin as f64 + 0.5) * bin_width) as f32
}

/// Foreground where the pixel is strictly above `threshold`.
pub fn binarize(data: &Array2<f32>, threshold: f32) -> Array2<bool> {
    data.mapv(|v| v > threshold)
}

fn finite_range(data: &Array2<f32>) -> Option<(f32, f32)> {
    data.iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otsu_bimodal() {
        let mut data = Array2::from_elem((10, 10), 200.0f32);
        for row in 5..10 {
            for col in 0..10 {
                data[[row, col]] = 800.0;
            }
        }
        let t = otsu_threshold(&data);
        assert!(t > 200.0 && t < 800.0, "threshold {t}");
        let mask = binarize(&data, t);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 50);
    }

    #[test]
    fn test_otsu_constant_image() {
        let data = Array2::from_elem((4, 4), 7.0f32);
        let t = otsu_threshold(&data);
        assert_eq!(t, 7.0);
        assert!(binarize(&data, t).iter().all(|&m| !m));
    }

    #[test]
    fn test_otsu_ignores_nan() {
        let mut data = Array2::from_elem((4, 4), 0.0f32);
        data[[0, 0]] = f32::NAN;
        data[[3, 3]] = 100.0;
        let t = otsu_threshold(&data);
        assert!(t.is_finite() && t < 100.0);
    }
}
