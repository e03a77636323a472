use std::fs::File;
use std::path::Path;

use ndarray::Array3;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::{PhotometricInterpretation, SampleFormat};

use efret_core::crosstalk::{CalibrationKind, CrosstalkCoefficients};
use efret_core::frame::{Channel, ImageStack};
use efret_core::segmentation::SegmentationConfig;

/// Camera offset added to every pixel of every synthetic channel.
pub const BACKGROUND: u16 = 100;

/// A filled circle in image coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Disk {
    pub row: usize,
    pub col: usize,
    pub radius: usize,
}

impl Disk {
    pub const fn new(row: usize, col: usize, radius: usize) -> Self {
        Self { row, col, radius }
    }

    fn contains(&self, row: usize, col: usize) -> bool {
        let dy = row as i64 - self.row as i64;
        let dx = col as i64 - self.col as i64;
        dy * dy + dx * dx <= (self.radius * self.radius) as i64
    }
}

/// One large cell in the middle of a 64x64 field.
pub const CENTRE_DISK: Disk = Disk::new(32, 32, 20);

/// Two well-separated cells in a 64x64 field; the upper-left one is region 1.
pub const TWO_DISKS: [Disk; 2] = [Disk::new(20, 20, 12), Disk::new(44, 44, 12)];

/// Segmentation radii small enough for 64x64 test fields.
pub fn small_segmentation() -> SegmentationConfig {
    SegmentationConfig {
        closing_radius: 3,
        erosion_radius: 3,
        opening_radius: 3,
        final_opening_radius: 2,
        extension_radius: 10,
        ..Default::default()
    }
}

/// Build a 4-channel stack of `frames` square frames.
///
/// Every pixel starts at [`BACKGROUND`]; pixels inside disk `i` additionally
/// receive `signal(frame, i, dx)` in [DD, DA, AD, AA] order, where `dx` is
/// the column offset from that disk's centre.
pub fn disk_stack<F>(size: usize, frames: usize, disks: &[Disk], signal: F) -> ImageStack
where
    F: Fn(usize, usize, i64) -> [u16; 4],
{
    let mut channels: [Array3<u16>; 4] =
        std::array::from_fn(|_| Array3::from_elem((frames, size, size), BACKGROUND));
    for frame in 0..frames {
        for row in 0..size {
            for col in 0..size {
                let Some(i) = disks.iter().position(|d| d.contains(row, col)) else {
                    continue;
                };
                let dx = col as i64 - disks[i].col as i64;
                let values = signal(frame, i, dx);
                for (channel, v) in channels.iter_mut().zip(values) {
                    channel[[frame, row, col]] += v;
                }
            }
        }
    }
    ImageStack::from_channels(channels).expect("consistent synthetic channels")
}

/// Pure-channel signal with a horizontal gradient: 1000 at the disk centre,
/// 20 more per column to the right.
pub fn gradient(dx: i64) -> f64 {
    1000.0 + 20.0 * dx as f64
}

/// Single-fluorophore calibration stack whose crosstalk channels are exact
/// multiples of the pure channel.
///
/// Acceptor-only: AA carries the gradient, DA = `first` * AA, AD = `second` * AA.
/// Donor-only: DD carries the gradient, AA = `first` * DD, DA = `second` * DD.
pub fn calibration_stack(
    kind: CalibrationKind,
    disks: &[Disk],
    frames: usize,
    first: f64,
    second: f64,
) -> ImageStack {
    disk_stack(64, frames, disks, |_, _, dx| {
        let pure = gradient(dx);
        let (a, b) = ((first * pure).round() as u16, (second * pure).round() as u16);
        match kind {
            CalibrationKind::Acceptor => [0, a, b, pure as u16],
            CalibrationKind::Donor => [pure as u16, b, 0, a],
        }
    })
}

/// Coefficients the synthetic bleach pairs are built with.
pub fn bleach_coefficients() -> CrosstalkCoefficients {
    CrosstalkCoefficients::new(0.1, 0.0, 0.0, 0.2)
}

/// Pre/post photobleaching stacks over `disks`, built so that with
/// [`bleach_coefficients`] the Fc loss of every pixel is exactly
/// `g[i]` times its donor dequenching.
///
/// Pre-bleach: DD = 500, AA = 1000 and Fc = 2500 everywhere in the cells.
/// Post-bleach in frame `f`: DD rises by `(f + 1) * (100 + 5 dx)`, AA drops
/// to 100 and Fc falls by `g[i]` times the DD rise.
pub fn bleach_pair_stacks(disks: &[Disk], frames: usize, g: &[f64]) -> (ImageStack, ImageStack) {
    let k = bleach_coefficients();
    let da = |dd: f64, aa: f64, fc: f64| (fc + k.a * (aa - k.c * dd) + k.d * (dd - k.b * aa)).round() as u16;

    let pre = disk_stack(64, frames, disks, |_, _, _| {
        [500, da(500.0, 1000.0, 2500.0), 50, 1000]
    });
    let post = disk_stack(64, frames, disks, |frame, i, dx| {
        let rise = (frame + 1) as f64 * (100.0 + 5.0 * dx as f64);
        let dd = 500.0 + rise;
        let fc = 2500.0 - g[i] * rise;
        [dd as u16, da(dd, 100.0, fc), 5, 100]
    });
    (pre, post)
}

/// Write `stack` as single-sample 16-bit pages interleaved DD, DA, AD, AA
/// per frame.
pub fn write_interleaved_tiff(stack: &ImageStack, path: &Path) {
    let file = File::create(path).expect("create tiff");
    let mut encoder = TiffEncoder::new(file).expect("tiff encoder");
    let (frames, h, w) = stack.dim();
    for frame in 0..frames {
        for channel in Channel::ALL {
            let page: Vec<u16> = stack
                .channel(channel)
                .index_axis(ndarray::Axis(0), frame)
                .iter()
                .copied()
                .collect();
            encoder
                .write_image::<colortype::Gray16>(w as u32, h as u32, &page)
                .expect("write page");
        }
    }
}

/// Four 16-bit samples tagged as plain grayscale, a layout readers cannot
/// map onto colour channels.
pub struct GrayX4;

impl colortype::ColorType for GrayX4 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16, 16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::Uint; 4];
}

/// Write `stack` as one 4-sample page per frame with colour type `C`,
/// channels in [DD, DA, AD, AA] order.
pub fn write_four_sample_tiff<C>(stack: &ImageStack, path: &Path)
where
    C: colortype::ColorType<Inner = u16>,
{
    let file = File::create(path).expect("create tiff");
    let mut encoder = TiffEncoder::new(file).expect("tiff encoder");
    let (frames, h, w) = stack.dim();
    for frame in 0..frames {
        let mut page = Vec::with_capacity(h * w * 4);
        for row in 0..h {
            for col in 0..w {
                for channel in Channel::ALL {
                    page.push(stack.channel(channel)[[frame, row, col]]);
                }
            }
        }
        encoder
            .write_image::<C>(w as u32, h as u32, &page)
            .expect("write page");
    }
}

/// Write `stack` as one RGBA16 page per frame, channels in [DD, DA, AD, AA] order.
pub fn write_rgba_tiff(stack: &ImageStack, path: &Path) {
    write_four_sample_tiff::<colortype::RGBA16>(stack, path);
}

/// Write `count` single-sample 16-bit pages of constant value.
pub fn write_gray_pages(path: &Path, count: usize, width: u32, height: u32) {
    let file = File::create(path).expect("create tiff");
    let mut encoder = TiffEncoder::new(file).expect("tiff encoder");
    let page = vec![BACKGROUND; (width * height) as usize];
    for _ in 0..count {
        encoder
            .write_image::<colortype::Gray16>(width, height, &page)
            .expect("write page");
    }
}
