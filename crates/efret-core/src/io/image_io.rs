use std::path::Path;

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{FretError, Result};
use crate::segmentation::LabelMap;

/// Linearly rescale the finite values of `image` to [0, 1]. Non-finite
/// pixels map to 0; a constant image maps to all zeros.
pub fn normalize(image: &Array2<f32>) -> Array2<f32> {
    let (lo, hi) = image
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    image.mapv(|v| {
        if !v.is_finite() || range <= 0.0 {
            0.0
        } else {
            (v - lo) / range
        }
    })
}

/// Save a mean image as min/max normalized 16-bit grayscale TIFF.
pub fn save_tiff(image: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let pixels: Vec<u16> = normalize(image)
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0) as u16)
        .collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or_else(|| FretError::Pipeline(format!("{w}x{h} buffer size mismatch")))?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a mean image as min/max normalized 8-bit grayscale PNG.
pub fn save_png(image: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = image.dim();
    let normalized = normalize(image);

    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in normalized.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([(v.clamp(0.0, 1.0) * 255.0) as u8]));
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a mean image, choosing the format from the file extension
/// (TIFF unless the extension is `png`).
pub fn save_image(image: &Array2<f32>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(image, path),
        _ => save_tiff(image, path),
    }
}

/// Save a boolean mask as 8-bit PNG (255 = foreground).
pub fn save_mask(mask: &Array2<bool>, path: &Path) -> Result<()> {
    let (h, w) = mask.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &m) in mask.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([if m { 255 } else { 0 }]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a label map as 8-bit PNG with region ids spread over 1..=255.
pub fn save_labels(labels: &LabelMap, path: &Path) -> Result<()> {
    let (h, w) = labels.labels().dim();
    let count = labels.count().max(1) as f64;
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &l) in labels.labels().indexed_iter() {
        let v = if l == 0 {
            0
        } else {
            (l as f64 / count * 254.0).round() as u8 + 1
        };
        img.put_pixel(col as u32, row as u32, Luma([v]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
