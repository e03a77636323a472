use ndarray::{Array2, Array3, Axis, Zip};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::crosstalk::CrosstalkCoefficients;

/// Crosstalk-corrected FRET intensity of one pixel, clipped at 0:
/// `DA - a (AA - c DD) - d (DD - b AA)`.
#[inline]
pub fn fc_pixel(dd: f64, da: f64, aa: f64, k: &CrosstalkCoefficients) -> f64 {
    (da - k.a * (aa - k.c * dd) - k.d * (dd - k.b * aa)).max(0.0)
}

/// Fc image series. All inputs share one (frames, height, width) shape.
pub fn fc_image(
    dd: &Array3<u16>,
    da: &Array3<u16>,
    aa: &Array3<u16>,
    coefficients: &CrosstalkCoefficients,
) -> Array3<f32> {
    let zip = Zip::from(dd).and(da).and(aa);
    let f = |&dd: &u16, &da: &u16, &aa: &u16| {
        fc_pixel(dd as f64, da as f64, aa as f64, coefficients) as f32
    };
    if dd.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(f)
    } else {
        zip.map_collect(f)
    }
}

/// Sensitization image `(Fc_pre - Fc_post) / (DD_post - DD_pre)` inside
/// `mask`. Pixels outside the mask or with no donor change are NaN.
pub fn g_image(
    fc_pre: &Array3<f32>,
    fc_post: &Array3<f32>,
    dd_pre: &Array3<u16>,
    dd_post: &Array3<u16>,
    mask: &Array2<bool>,
) -> Array3<f32> {
    let mut g = Array3::<f32>::from_elem(fc_pre.dim(), f32::NAN);
    g.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(f, mut frame)| {
            Zip::from(&mut frame)
                .and(mask)
                .and(fc_pre.index_axis(Axis(0), f))
                .and(fc_post.index_axis(Axis(0), f))
                .and(dd_pre.index_axis(Axis(0), f))
                .and(dd_post.index_axis(Axis(0), f))
                .for_each(|out, &m, &fpre, &fpost, &dpre, &dpost| {
                    let delta_dd = dpost as f32 - dpre as f32;
                    if m && delta_dd != 0.0 {
                        *out = (fpre - fpost) / delta_dd;
                    }
                });
        });
    g
}

/// Per-pixel donor dequenching in one frame, `max(DD_post - DD_pre, 0)`.
pub fn delta_dd_frame(dd_pre: &Array3<u16>, dd_post: &Array3<u16>, frame: usize) -> Array2<f64> {
    Zip::from(dd_pre.index_axis(Axis(0), frame))
        .and(dd_post.index_axis(Axis(0), frame))
        .map_collect(|&pre, &post| (post as f64 - pre as f64).max(0.0))
}

/// Per-pixel Fc loss in one frame, `max(Fc_pre - Fc_post, 0)`.
pub fn delta_fc_frame(fc_pre: &Array3<f32>, fc_post: &Array3<f32>, frame: usize) -> Array2<f64> {
    Zip::from(fc_pre.index_axis(Axis(0), frame))
        .and(fc_post.index_axis(Axis(0), frame))
        .map_collect(|&pre, &post| (pre as f64 - post as f64).max(0.0))
}
