use ndarray::{s, Array2, Array3, Array4, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::consts::CHANNEL_COUNT;
use crate::error::{FretError, Result};

/// One of the four 3-cube fluorescence channels, in acquisition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Donor excitation, donor emission.
    DD,
    /// Donor excitation, acceptor emission (raw FRET channel).
    DA,
    /// Acceptor excitation, donor emission.
    AD,
    /// Acceptor excitation, acceptor emission.
    AA,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [Channel::DD, Channel::DA, Channel::AD, Channel::AA];

    /// Position of the channel on the last axis of a decoded stack.
    pub fn index(self) -> usize {
        match self {
            Self::DD => 0,
            Self::DA => 1,
            Self::AD => 2,
            Self::AA => 3,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DD => write!(f, "DD"),
            Self::DA => write!(f, "DA"),
            Self::AD => write!(f, "AD"),
            Self::AA => write!(f, "AA"),
        }
    }
}

/// A 4-channel registration: every channel is shaped (frames, height, width).
#[derive(Clone, Debug)]
pub struct ImageStack {
    channels: [Array3<u16>; CHANNEL_COUNT],
}

impl ImageStack {
    /// Build a stack from per-channel arrays in [DD, DA, AD, AA] order.
    ///
    /// All channels must share one shape with at least one frame.
    pub fn from_channels(channels: [Array3<u16>; CHANNEL_COUNT]) -> Result<Self> {
        let expected = channels[0].dim();
        if let Some(bad) = channels.iter().find(|c| c.dim() != expected) {
            return Err(FretError::ShapeMismatch {
                expected,
                found: bad.dim(),
            });
        }
        if expected.0 == 0 {
            return Err(FretError::EmptySequence);
        }
        Ok(Self { channels })
    }

    pub fn new(
        dd: Array3<u16>,
        da: Array3<u16>,
        ad: Array3<u16>,
        aa: Array3<u16>,
    ) -> Result<Self> {
        Self::from_channels([dd, da, ad, aa])
    }

    /// Split a decoded `[frame, row, col, channel]` array into channels.
    pub fn from_array4(data: Array4<u16>) -> Result<Self> {
        let (frames, h, w, c) = data.dim();
        if c != CHANNEL_COUNT {
            return Err(FretError::InvalidStack(format!(
                "expected {CHANNEL_COUNT} channels, found {c} ({frames}x{h}x{w})"
            )));
        }
        let channels = Channel::ALL.map(|ch| data.index_axis(Axis(3), ch.index()).to_owned());
        Self::from_channels(channels)
    }

    pub fn channel(&self, channel: Channel) -> &Array3<u16> {
        &self.channels[channel.index()]
    }

    /// (frames, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.channels[0].dim()
    }

    pub fn frame_count(&self) -> usize {
        self.dim().0
    }

    pub fn height(&self) -> usize {
        self.dim().1
    }

    pub fn width(&self) -> usize {
        self.dim().2
    }

    /// Apply `f` to every channel, keeping channel order.
    pub fn map_channels<F>(self, f: F) -> Self
    where
        F: Fn(Array3<u16>) -> Array3<u16>,
    {
        Self {
            channels: self.channels.map(f),
        }
    }

    /// Keep only the first `frames` frames. A limit past the end is a no-op.
    pub fn truncate_frames(self, frames: usize) -> Result<Self> {
        if frames == 0 {
            return Err(FretError::EmptySequence);
        }
        if frames >= self.frame_count() {
            return Ok(self);
        }
        Ok(self.map_channels(|c| c.slice(s![..frames, .., ..]).to_owned()))
    }

    /// Time-mean image of one channel.
    pub fn mean_image(&self, channel: Channel) -> Array2<f32> {
        time_mean(self.channel(channel))
    }

    /// Whole-frame mean intensity of one channel, one value per frame.
    pub fn frame_mean_profile(&self, channel: Channel) -> Vec<f64> {
        self.channel(channel)
            .axis_iter(Axis(0))
            .map(|frame| {
                let n = frame.len().max(1) as f64;
                frame.iter().map(|&v| v as f64).sum::<f64>() / n
            })
            .collect()
    }
}

/// Per-pixel mean over the frame axis, accumulated in f64.
///
/// Non-finite samples are skipped; a pixel with none left is NaN.
pub fn time_mean<T>(series: &Array3<T>) -> Array2<f32>
where
    T: Copy + num_traits::AsPrimitive<f64>,
{
    let (_, h, w) = series.dim();
    let mut sum = Array2::<f64>::zeros((h, w));
    let mut count = Array2::<u32>::zeros((h, w));
    for frame in series.axis_iter(Axis(0)) {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&frame)
            .for_each(|s, c, &v| {
                let v: f64 = v.as_();
                if v.is_finite() {
                    *s += v;
                    *c += 1;
                }
            });
    }
    Zip::from(&sum).and(&count).map_collect(|&s, &c| {
        if c > 0 {
            (s / c as f64) as f32
        } else {
            f32::NAN
        }
    })
}
