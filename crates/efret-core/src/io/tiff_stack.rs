use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{Array3, Array4};
use num_traits::AsPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::{PhotometricInterpretation, Tag};
use tracing::{debug, info};

use crate::consts::{CHANNEL_COUNT, TIFF_DECODING_LIMIT_BYTES};
use crate::error::{FretError, Result};
use crate::frame::{Channel, ImageStack};

/// One decoded TIFF page.
struct Page {
    width: usize,
    height: usize,
    samples: usize,
    data: Vec<u16>,
}

/// Summary of a multi-page TIFF registration.
#[derive(Clone, Debug)]
pub struct StackInfo {
    pub pages: usize,
    pub frames: usize,
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
}

fn widen<T: AsPrimitive<u16>>(buf: Vec<T>) -> Vec<u16> {
    buf.into_iter().map(|v| v.as_()).collect()
}

/// Samples per pixel of the current page, checked against its photometric
/// interpretation before any pixel data is decoded.
fn page_samples(decoder: &mut Decoder<BufReader<File>>, index: usize) -> Result<usize> {
    let samples = decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
        .unwrap_or(1) as usize;
    let photometric = decoder
        .find_tag_unsigned::<u16>(Tag::PhotometricInterpretation)?
        .and_then(PhotometricInterpretation::from_u16);

    match (samples, photometric) {
        (1, Some(PhotometricInterpretation::BlackIsZero | PhotometricInterpretation::WhiteIsZero)) => {
            Ok(1)
        }
        (CHANNEL_COUNT, Some(PhotometricInterpretation::RGB | PhotometricInterpretation::CMYK)) => {
            Ok(CHANNEL_COUNT)
        }
        (CHANNEL_COUNT, Some(other)) => Err(FretError::InvalidStack(format!(
            "page {index}: {CHANNEL_COUNT} samples per pixel tagged {other:?}, \
             expected RGB or CMYK"
        ))),
        (n, other) => Err(FretError::InvalidStack(format!(
            "page {index}: {n} samples per pixel with photometric {other:?}, \
             expected 1 (grayscale) or {CHANNEL_COUNT}"
        ))),
    }
}

fn read_page(decoder: &mut Decoder<BufReader<File>>, index: usize) -> Result<Page> {
    let (width, height) = decoder.dimensions()?;
    let samples = page_samples(decoder, index)?;
    let data = match decoder.read_image()? {
        DecodingResult::U8(buf) => widen(buf),
        DecodingResult::U16(buf) => buf,
        _ => {
            return Err(FretError::InvalidStack(format!(
                "page {index}: only 8- and 16-bit unsigned samples are supported"
            )))
        }
    };
    Ok(Page {
        width: width as usize,
        height: height as usize,
        samples,
        data,
    })
}

fn read_pages(path: &Path) -> Result<Vec<Page>> {
    let file = File::open(path)?;

    let mut limits = Limits::default();
    limits.decoding_buffer_size = TIFF_DECODING_LIMIT_BYTES;
    limits.ifd_value_size = TIFF_DECODING_LIMIT_BYTES;
    limits.intermediate_buffer_size = TIFF_DECODING_LIMIT_BYTES;

    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(limits);
    let mut pages = vec![read_page(&mut decoder, 0)?];
    while decoder.more_images() {
        decoder.next_image()?;
        let page = read_page(&mut decoder, pages.len())?;
        let first = &pages[0];
        if (page.width, page.height, page.samples) != (first.width, first.height, first.samples) {
            return Err(FretError::InvalidStack(format!(
                "page {} is {}x{}x{}, page 0 is {}x{}x{}",
                pages.len(),
                page.width,
                page.height,
                page.samples,
                first.width,
                first.height,
                first.samples
            )));
        }
        pages.push(page);
    }
    Ok(pages)
}

fn describe(pages: &[Page]) -> StackInfo {
    let first = &pages[0];
    let frames = if first.samples == CHANNEL_COUNT {
        pages.len()
    } else {
        pages.len() / CHANNEL_COUNT
    };
    StackInfo {
        pages: pages.len(),
        frames,
        width: first.width,
        height: first.height,
        samples_per_pixel: first.samples,
    }
}

/// Frame count, page size and layout of a registration without splitting
/// it into channels.
pub fn stack_info(path: &Path) -> Result<StackInfo> {
    Ok(describe(&read_pages(path)?))
}

/// Load a 4-channel registration from a multi-page TIFF.
///
/// Two layouts are accepted:
/// - one page per frame with 4 samples per pixel in [DD, DA, AD, AA] order;
/// - single-sample pages interleaved frame-major as DD, DA, AD, AA, so the
///   page count must be a multiple of 4.
pub fn load_stack(path: &Path) -> Result<ImageStack> {
    load_stack_with_info(path).map(|(stack, _)| stack)
}

/// [`load_stack`] together with the page layout, from a single decode.
pub fn load_stack_with_info(path: &Path) -> Result<(ImageStack, StackInfo)> {
    let pages = read_pages(path)?;
    let info = describe(&pages);
    let (w, h, samples) = (info.width, info.height, info.samples_per_pixel);
    let stack = if samples == CHANNEL_COUNT {
        let frames = pages.len();
        let data: Vec<u16> = pages.into_iter().flat_map(|p| p.data).collect();
        let array = Array4::from_shape_vec((frames, h, w, CHANNEL_COUNT), data)
            .map_err(|e| FretError::InvalidStack(e.to_string()))?;
        ImageStack::from_array4(array)?
    } else {
        if pages.len() % CHANNEL_COUNT != 0 {
            return Err(FretError::InvalidStack(format!(
                "{} single-channel pages cannot be split into {CHANNEL_COUNT} channels",
                pages.len()
            )));
        }
        let frames = pages.len() / CHANNEL_COUNT;
        let mut per_channel: [Vec<u16>; CHANNEL_COUNT] = Default::default();
        for (i, page) in pages.into_iter().enumerate() {
            per_channel[i % CHANNEL_COUNT].extend(page.data);
        }
        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for data in per_channel {
            channels.push(
                Array3::from_shape_vec((frames, h, w), data)
                    .map_err(|e| FretError::InvalidStack(e.to_string()))?,
            );
        }
        let channels: [Array3<u16>; CHANNEL_COUNT] = channels
            .try_into()
            .map_err(|_| FretError::InvalidStack("channel split failed".to_string()))?;
        ImageStack::from_channels(channels)?
    };

    debug!(samples_per_pixel = samples, "TIFF layout");
    info!(
        path = %path.display(),
        frames = stack.frame_count(),
        width = stack.width(),
        height = stack.height(),
        "Loaded stack"
    );
    Ok((stack, info))
}

