use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::crosstalk::CrosstalkCoefficients;
use crate::error::{FretError, Result};
use crate::filters::correct_background;
use crate::frame::{time_mean, Channel, ImageStack};
use crate::regions::{
    label_profiles, masked_mean_profile, pool_region_pixels, NamedProfile, PooledSamples,
    RegionProfiles,
};
use crate::segmentation::{bleach_segmentation, BleachSegmentation, LabelMap, SegmentationConfig};
use crate::stats::{linregress, nan_median, LinearFit};

use super::images::{delta_dd_frame, delta_fc_frame, fc_image, g_image};

/// Derived images that can be reduced to a time-mean picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    FcPre,
    FcPost,
    G,
    AA,
}

impl ImageKind {
    pub const ALL: [ImageKind; 4] = [ImageKind::FcPre, ImageKind::FcPost, ImageKind::G, ImageKind::AA];
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FcPre => write!(f, "fc_pre"),
            Self::FcPost => write!(f, "fc_post"),
            Self::G => write!(f, "g"),
            Self::AA => write!(f, "aa"),
        }
    }
}

/// Per-frame G statistics of one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GRegionProfile {
    pub label: u32,
    pub means: Vec<f64>,
    pub sds: Vec<f64>,
    /// Median of `means` over frames.
    pub median: f64,
}

/// Pre/post photobleaching registrations of the same field.
#[derive(Clone, Debug)]
pub struct BleachPair {
    name: String,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
}

impl BleachPair {
    /// Pair two stacks; they must have identical shapes.
    pub fn new(
        name: impl Into<String>,
        pre: ImageStack,
        post: ImageStack,
        coefficients: CrosstalkCoefficients,
    ) -> Result<Self> {
        if pre.dim() != post.dim() {
            return Err(FretError::ShapeMismatch {
                expected: pre.dim(),
                found: post.dim(),
            });
        }
        Ok(Self {
            name: name.into(),
            pre,
            post,
            coefficients,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn correct_background(self) -> CorrectedBleachPair {
        CorrectedBleachPair {
            pre: correct_background(self.pre),
            post: correct_background(self.post),
            name: self.name,
            coefficients: self.coefficients,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CorrectedBleachPair {
    name: String,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
}

impl CorrectedBleachPair {
    pub fn pre(&self) -> &ImageStack {
        &self.pre
    }

    pub fn post(&self) -> &ImageStack {
        &self.post
    }

    /// Build the wide and narrow cell masks from the pre-bleach AA mean.
    pub fn segment(self, config: &SegmentationConfig) -> SegmentedBleachPair {
        let reference = self.pre.mean_image(Channel::AA);
        let segmentation = bleach_segmentation(&reference, config);
        info!(
            name = %self.name,
            regions = segmentation.labels.count(),
            frames = self.pre.frame_count(),
            "Bleach pair segmented"
        );
        SegmentedBleachPair {
            name: self.name,
            pre: self.pre,
            post: self.post,
            coefficients: self.coefficients,
            segmentation,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SegmentedBleachPair {
    name: String,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
    segmentation: BleachSegmentation,
}

impl SegmentedBleachPair {
    pub fn labels(&self) -> &LabelMap {
        &self.segmentation.labels
    }

    pub fn compute_fc(self) -> FcBleachPair {
        let k = &self.coefficients;
        let fc_pre = fc_image(
            self.pre.channel(Channel::DD),
            self.pre.channel(Channel::DA),
            self.pre.channel(Channel::AA),
            k,
        );
        let fc_post = fc_image(
            self.post.channel(Channel::DD),
            self.post.channel(Channel::DA),
            self.post.channel(Channel::AA),
            k,
        );
        debug!(name = %self.name, coefficients = %k, "Fc computed");
        FcBleachPair {
            name: self.name,
            pre: self.pre,
            post: self.post,
            coefficients: self.coefficients,
            segmentation: self.segmentation,
            fc_pre,
            fc_post,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FcBleachPair {
    name: String,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
    segmentation: BleachSegmentation,
    fc_pre: Array3<f32>,
    fc_post: Array3<f32>,
}

impl FcBleachPair {
    pub fn fc_pre(&self) -> &Array3<f32> {
        &self.fc_pre
    }

    pub fn fc_post(&self) -> &Array3<f32> {
        &self.fc_post
    }

    pub fn compute_g(self) -> BleachAnalysis {
        let g = g_image(
            &self.fc_pre,
            &self.fc_post,
            self.pre.channel(Channel::DD),
            self.post.channel(Channel::DD),
            &self.segmentation.mask,
        );
        info!(name = %self.name, "G image computed");
        BleachAnalysis {
            name: self.name,
            pre: self.pre,
            post: self.post,
            coefficients: self.coefficients,
            segmentation: self.segmentation,
            fc_pre: self.fc_pre,
            fc_post: self.fc_post,
            g,
        }
    }
}

/// Fully processed bleach pair; fits and profiles are computed on demand.
#[derive(Clone, Debug)]
pub struct BleachAnalysis {
    name: String,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
    segmentation: BleachSegmentation,
    fc_pre: Array3<f32>,
    fc_post: Array3<f32>,
    g: Array3<f32>,
}

impl BleachAnalysis {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pre(&self) -> &ImageStack {
        &self.pre
    }

    pub fn post(&self) -> &ImageStack {
        &self.post
    }

    pub fn coefficients(&self) -> &CrosstalkCoefficients {
        &self.coefficients
    }

    /// Narrow cell mask used for every aggregation.
    pub fn mask(&self) -> &Array2<bool> {
        &self.segmentation.mask
    }

    /// Cells plus margin; its complement is background.
    pub fn wide_mask(&self) -> &Array2<bool> {
        &self.segmentation.wide_mask
    }

    pub fn labels(&self) -> &LabelMap {
        &self.segmentation.labels
    }

    pub fn fc_pre(&self) -> &Array3<f32> {
        &self.fc_pre
    }

    pub fn fc_post(&self) -> &Array3<f32> {
        &self.fc_post
    }

    pub fn g(&self) -> &Array3<f32> {
        &self.g
    }

    fn require_regions(&self) -> Result<()> {
        if self.labels().is_empty() {
            return Err(FretError::NoRegions {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    fn fit_pooled(&self, pooled: PooledSamples, what: &str) -> Result<LinearFit> {
        for id in &pooled.regions_dropped {
            warn!(name = %self.name, region = id, "Region has no usable {what} samples");
        }
        if pooled.is_empty() {
            return Err(FretError::NoUsableSamples(format!(
                "'{}': every region was excluded from the {what} G fit",
                self.name
            )));
        }
        let fit = linregress(&pooled.x, &pooled.y)?;
        info!(
            name = %self.name,
            g = fit.slope,
            stderr = fit.slope_stderr,
            p = fit.slope_p,
            r2 = fit.r_squared(),
            regions = pooled.regions_used.len(),
            "G fitted ({what})"
        );
        Ok(fit)
    }

    /// Regression of per-region mean Fc loss on per-region mean donor
    /// dequenching, one sample per region and frame.
    pub fn fit_g_frames(&self, bad_rois: &[u32]) -> Result<LinearFit> {
        self.require_regions()?;
        let labels = self.labels();
        let dd_pre = label_profiles(labels, self.pre.channel(Channel::DD));
        let dd_post = label_profiles(labels, self.post.channel(Channel::DD));
        let fc_pre = label_profiles(labels, &self.fc_pre);
        let fc_post = label_profiles(labels, &self.fc_post);

        let mut pooled = PooledSamples::default();
        for (row, &id) in dd_pre.labels.iter().enumerate() {
            if bad_rois.contains(&id) {
                continue;
            }
            let (mut xs, mut ys) = (Vec::new(), Vec::new());
            for frame in 0..dd_pre.frame_count() {
                let delta_dd = dd_post.means[[row, frame]] - dd_pre.means[[row, frame]];
                let delta_fc = fc_pre.means[[row, frame]] - fc_post.means[[row, frame]];
                if delta_dd.is_finite() && delta_fc.is_finite() {
                    xs.push(delta_dd);
                    ys.push(delta_fc);
                }
            }
            pooled.push_region(id, xs, ys);
        }
        self.fit_pooled(pooled, "frame-wise")
    }

    /// Pixel-wise regression of Fc loss on donor dequenching in one frame.
    /// Pixels where either change is not positive are dropped.
    pub fn fit_g_pixels(&self, frame: usize, bad_rois: &[u32]) -> Result<LinearFit> {
        let total = self.pre.frame_count();
        if frame >= total {
            return Err(FretError::FrameIndexOutOfRange {
                index: frame,
                total,
            });
        }
        self.require_regions()?;

        let delta_dd = delta_dd_frame(
            self.pre.channel(Channel::DD),
            self.post.channel(Channel::DD),
            frame,
        );
        let delta_fc = delta_fc_frame(&self.fc_pre, &self.fc_post, frame);
        let pooled = pool_region_pixels(
            self.labels(),
            delta_dd.view(),
            delta_fc.view(),
            bad_rois,
            |dd, fc| dd > 0.0 && fc > 0.0,
        );
        self.fit_pooled(pooled, "pixel-wise")
    }

    /// Mask-restricted mean per frame of every channel before and after
    /// bleaching, and of Fc.
    pub fn channel_profiles(&self) -> Vec<NamedProfile> {
        let mask = self.mask();
        let mut profiles = Vec::with_capacity(2 * Channel::ALL.len() + 2);
        for channel in Channel::ALL {
            profiles.push(NamedProfile::new(
                format!("{channel} pre"),
                masked_mean_profile(mask, self.pre.channel(channel)),
            ));
            profiles.push(NamedProfile::new(
                format!("{channel} post"),
                masked_mean_profile(mask, self.post.channel(channel)),
            ));
        }
        profiles.push(NamedProfile::new("Fc pre", masked_mean_profile(mask, &self.fc_pre)));
        profiles.push(NamedProfile::new("Fc post", masked_mean_profile(mask, &self.fc_post)));
        profiles
    }

    /// Per-region mean and sd of the G image per frame.
    pub fn g_label_profiles(&self) -> Vec<GRegionProfile> {
        let RegionProfiles { labels, means, sds } = label_profiles(self.labels(), &self.g);
        labels
            .into_iter()
            .enumerate()
            .map(|(row, label)| {
                let means = means.row(row).to_vec();
                GRegionProfile {
                    label,
                    median: nan_median(&means),
                    means,
                    sds: sds.row(row).to_vec(),
                }
            })
            .collect()
    }

    /// Mean per frame of every channel outside the wide mask.
    pub fn background_profiles(&self) -> Vec<NamedProfile> {
        let background = self.wide_mask().mapv(|m| !m);
        Channel::ALL
            .iter()
            .flat_map(|&channel| {
                [
                    NamedProfile::new(
                        format!("{channel} pre"),
                        masked_mean_profile(&background, self.pre.channel(channel)),
                    ),
                    NamedProfile::new(
                        format!("{channel} post"),
                        masked_mean_profile(&background, self.post.channel(channel)),
                    ),
                ]
            })
            .collect()
    }

    /// Time-mean picture of a derived image. Non-finite G pixels are skipped.
    pub fn mean_image(&self, kind: ImageKind) -> Array2<f32> {
        match kind {
            ImageKind::FcPre => time_mean(&self.fc_pre),
            ImageKind::FcPost => time_mean(&self.fc_post),
            ImageKind::G => time_mean(&self.g),
            ImageKind::AA => self.pre.mean_image(Channel::AA),
        }
    }
}

/// Run a pair through background correction, segmentation, Fc and G.
pub fn analyze_pair(pair: BleachPair, config: &SegmentationConfig) -> BleachAnalysis {
    pair.correct_background()
        .segment(config)
        .compute_fc()
        .compute_g()
}
