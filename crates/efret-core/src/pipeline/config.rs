use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_STACK_EXTENSION;
use crate::crosstalk::{CalibrationKind, CrosstalkCoefficients, RegistrationMeta};
use crate::segmentation::SegmentationConfig;

fn default_extension() -> String {
    DEFAULT_STACK_EXTENSION.to_string()
}

/// Resolve `<data_dir>/<stem>.<extension>`.
fn stack_path(data_dir: &Path, stem: &str, extension: &str) -> PathBuf {
    data_dir.join(format!("{stem}.{extension}"))
}

/// One single-fluorophore calibration registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// File stem of the stack inside the data directory.
    pub name: String,
    pub donor_exposure: f64,
    pub acceptor_exposure: f64,
}

impl CalibrationEntry {
    pub fn meta(&self, kind: CalibrationKind) -> RegistrationMeta {
        RegistrationMeta::new(
            self.name.clone(),
            kind,
            self.donor_exposure,
            self.acceptor_exposure,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSetConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Acceptor-only registrations (coefficients a, b).
    #[serde(default)]
    pub acceptors: Vec<CalibrationEntry>,
    /// Donor-only registrations (coefficients c, d).
    #[serde(default)]
    pub donors: Vec<CalibrationEntry>,
    /// Keep only the first N frames of every stack.
    #[serde(default)]
    pub frame_limit: Option<usize>,
}

impl CalibrationSetConfig {
    pub fn stack_path(&self, stem: &str) -> PathBuf {
        stack_path(&self.data_dir, stem, &self.extension)
    }

    /// Registration metadata in processing order: acceptors, then donors.
    pub fn registrations(&self) -> Vec<RegistrationMeta> {
        self.acceptors
            .iter()
            .map(|e| e.meta(CalibrationKind::Acceptor))
            .chain(self.donors.iter().map(|e| e.meta(CalibrationKind::Donor)))
            .collect()
    }
}

/// One pre/post photobleaching pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BleachRegistrationConfig {
    pub name: String,
    /// File stem of the pre-bleach stack.
    pub pre: String,
    /// File stem of the post-bleach stack.
    pub post: String,
    /// Number of frames acquired during bleaching.
    #[serde(default)]
    pub bleach_frame: usize,
    /// Exposure of the bleaching illumination.
    #[serde(default)]
    pub bleach_exposure: f64,
    pub acceptor_exposure: f64,
    pub donor_exposure: f64,
    /// Region ids left out of every G fit.
    #[serde(default)]
    pub bad_rois: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BleachSetConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub registrations: Vec<BleachRegistrationConfig>,
    #[serde(default)]
    pub frame_limit: Option<usize>,
}

impl BleachSetConfig {
    pub fn stack_path(&self, stem: &str) -> PathBuf {
        stack_path(&self.data_dir, stem, &self.extension)
    }
}

/// A full experiment: calibration and/or bleach analysis.
///
/// When `coefficients` is set it overrides the ones derived from the
/// calibration set. With `export_dir` set, mean images and masks of every
/// registration are written there.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    pub calibration: Option<CalibrationSetConfig>,
    pub bleach: Option<BleachSetConfig>,
    pub coefficients: Option<CrosstalkCoefficients>,
}
