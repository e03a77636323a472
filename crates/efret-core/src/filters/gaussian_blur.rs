use ndarray::{Array2, Axis, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Separable Gaussian blur of a mean image. Edges are clamped.
///
/// A non-positive sigma returns the input unchanged.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_along(data, &kernel, Axis(1));
    convolve_along(&row_pass, &kernel, Axis(0))
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// 1D convolution along `axis` (1 = along rows, 0 = along columns).
fn convolve_along(data: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;
    let len = data.len_of(axis) as isize;

    let sample = |(row, col): (usize, usize)| -> f32 {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let offset = ki as isize - radius;
            let value = if axis == Axis(1) {
                let c = (col as isize + offset).clamp(0, len - 1) as usize;
                data[[row, c]]
            } else {
                let r = (row as isize + offset).clamp(0, len - 1) as usize;
                data[[r, col]]
            };
            sum += value * kv;
        }
        sum
    };

    let mut result = Array2::<f32>::zeros((h, w));
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut result).par_for_each(|idx, out| *out = sample(idx));
    } else {
        Zip::indexed(&mut result).for_each(|idx, out| *out = sample(idx));
    }
    result
}
