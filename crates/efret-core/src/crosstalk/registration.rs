use ndarray::{Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FretError, Result};
use crate::filters::correct_background;
use crate::frame::{Channel, ImageStack};
use crate::regions::{label_profiles, pool_region_pixels, NamedProfile};
use crate::segmentation::{calibration_segmentation, LabelMap, Segmentation, SegmentationConfig};
use crate::stats::{linregress, LinearFit};

use super::coefficients::{CalibrationKind, Coefficient, CoefficientEstimate, CrosstalkEstimate};

/// Identity of a calibration registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationMeta {
    pub name: String,
    pub kind: CalibrationKind,
    pub donor_exposure: f64,
    pub acceptor_exposure: f64,
}

impl RegistrationMeta {
    pub fn new(
        name: impl Into<String>,
        kind: CalibrationKind,
        donor_exposure: f64,
        acceptor_exposure: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            donor_exposure,
            acceptor_exposure,
        }
    }
}

/// Raw calibration registration, as loaded.
#[derive(Clone, Debug)]
pub struct CalibrationRegistration {
    meta: RegistrationMeta,
    stack: ImageStack,
}

impl CalibrationRegistration {
    pub fn new(meta: RegistrationMeta, stack: ImageStack) -> Self {
        Self { meta, stack }
    }

    pub fn meta(&self) -> &RegistrationMeta {
        &self.meta
    }

    pub fn stack(&self) -> &ImageStack {
        &self.stack
    }

    /// Per-frame percentile background subtraction of all four channels.
    pub fn correct_background(self) -> CorrectedCalibration {
        CorrectedCalibration {
            stack: correct_background(self.stack),
            meta: self.meta,
        }
    }
}

/// Background-corrected calibration registration.
#[derive(Clone, Debug)]
pub struct CorrectedCalibration {
    meta: RegistrationMeta,
    stack: ImageStack,
}

impl CorrectedCalibration {
    pub fn meta(&self) -> &RegistrationMeta {
        &self.meta
    }

    pub fn stack(&self) -> &ImageStack {
        &self.stack
    }

    /// Segment cells on the time-mean of the registration's reference
    /// channel (AA for acceptor-only, DD for donor-only samples).
    pub fn segment(self, config: &SegmentationConfig) -> SegmentedCalibration {
        let reference = self.stack.mean_image(self.meta.kind.reference_channel());
        let segmentation = calibration_segmentation(&reference, config);
        info!(
            name = %self.meta.name,
            kind = %self.meta.kind,
            regions = segmentation.labels.count(),
            "Calibration segmented"
        );
        SegmentedCalibration {
            meta: self.meta,
            stack: self.stack,
            segmentation,
        }
    }
}

/// Corrected and segmented calibration registration, ready for estimation.
#[derive(Clone, Debug)]
pub struct SegmentedCalibration {
    meta: RegistrationMeta,
    stack: ImageStack,
    segmentation: Segmentation,
}

impl SegmentedCalibration {
    pub fn meta(&self) -> &RegistrationMeta {
        &self.meta
    }

    pub fn stack(&self) -> &ImageStack {
        &self.stack
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.segmentation.mask
    }

    pub fn labels(&self) -> &LabelMap {
        &self.segmentation.labels
    }

    fn check_coefficient(&self, coefficient: Coefficient) -> Result<()> {
        if coefficient.kind() != self.meta.kind {
            return Err(FretError::ConfigurationMismatch {
                coefficient,
                kind: self.meta.kind,
            });
        }
        Ok(())
    }

    /// Channel ratio series of a coefficient; NaN where the denominator is 0.
    pub fn ratio_series(&self, coefficient: Coefficient) -> Result<Array3<f32>> {
        self.check_coefficient(coefficient)?;
        let (num, den) = coefficient.ratio_channels();
        Ok(ratio(self.stack.channel(num), self.stack.channel(den)))
    }

    /// Per-frame coefficient profile from per-region mean ratios.
    pub fn coefficient_estimate(&self, coefficient: Coefficient) -> Result<CoefficientEstimate> {
        let series = self.ratio_series(coefficient)?;
        if self.labels().is_empty() {
            return Err(FretError::NoRegions {
                name: self.meta.name.clone(),
            });
        }

        let profile = label_profiles(self.labels(), &series).mean_over_regions();
        if let Some(frame) = profile.iter().position(|v| !v.is_finite()) {
            return Err(FretError::NoUsableSamples(format!(
                "'{}': no region has a finite {coefficient} ratio in frame {frame}",
                self.meta.name
            )));
        }
        Ok(CoefficientEstimate::from_profile(
            self.meta.clone(),
            coefficient,
            profile,
        ))
    }

    /// Both coefficients this registration's kind provides.
    pub fn estimate(&self) -> Result<CrosstalkEstimate> {
        let estimate = match self.meta.kind {
            CalibrationKind::Acceptor => CrosstalkEstimate::Acceptor {
                a: self.coefficient_estimate(Coefficient::A)?,
                b: self.coefficient_estimate(Coefficient::B)?,
            },
            CalibrationKind::Donor => CrosstalkEstimate::Donor {
                c: self.coefficient_estimate(Coefficient::C)?,
                d: self.coefficient_estimate(Coefficient::D)?,
            },
        };
        for e in estimate.estimates() {
            info!(
                name = %self.meta.name,
                coefficient = %e.coefficient,
                value = e.value,
                sd = e.sd,
                "Coefficient estimated"
            );
        }
        Ok(estimate)
    }

    /// Pooled pixel-wise fit of the crosstalk channel on the pure channel in
    /// one frame. Pixels where either channel is 0 and regions listed in
    /// `bad_rois` are excluded.
    pub fn pixel_fit(&self, frame: usize, coefficient: Coefficient, bad_rois: &[u32]) -> Result<LinearFit> {
        self.check_coefficient(coefficient)?;
        let total = self.stack.frame_count();
        if frame >= total {
            return Err(FretError::FrameIndexOutOfRange {
                index: frame,
                total,
            });
        }

        let (cross_channel, pure_channel) = coefficient.ratio_channels();
        let pure = self.stack.channel(pure_channel).index_axis(Axis(0), frame);
        let cross = self.stack.channel(cross_channel).index_axis(Axis(0), frame);

        let pooled = pool_region_pixels(self.labels(), pure, cross, bad_rois, |p, c| {
            p > 0.0 && c > 0.0
        });
        for id in &pooled.regions_dropped {
            warn!(name = %self.meta.name, region = id, "Region has no usable pixels");
        }
        if pooled.is_empty() {
            return Err(FretError::NoUsableSamples(format!(
                "'{}': every region was excluded from the {coefficient} fit",
                self.meta.name
            )));
        }
        linregress(&pooled.x, &pooled.y)
    }

    /// Whole-frame mean of every channel per frame.
    pub fn channel_profiles(&self) -> Vec<NamedProfile> {
        Channel::ALL
            .iter()
            .map(|&c| NamedProfile::new(c.to_string(), self.stack.frame_mean_profile(c)))
            .collect()
    }

    /// Time-mean image of every channel, in [DD, DA, AD, AA] order.
    pub fn mean_images(&self) -> Vec<(Channel, Array2<f32>)> {
        Channel::ALL
            .iter()
            .map(|&c| (c, self.stack.mean_image(c)))
            .collect()
    }
}

fn ratio(num: &Array3<u16>, den: &Array3<u16>) -> Array3<f32> {
    Zip::from(num).and(den).par_map_collect(|&n, &d| {
        if d == 0 {
            f32::NAN
        } else {
            n as f32 / d as f32
        }
    })
}
