use std::path::Path;

use tracing::{debug, warn};

use crate::crosstalk::SegmentedCalibration;
use crate::error::Result;
use crate::fret::{BleachAnalysis, ImageKind};

use super::image_io::{save_image, save_labels, save_mask};

/// Write channel mean images, cell mask and label map of a calibration
/// registration into `dir`, prefixed with the registration name.
pub fn export_calibration(registration: &SegmentedCalibration, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let name = &registration.meta().name;
    for (channel, image) in registration.mean_images() {
        save_image(&image, &dir.join(format!("{name}_{channel}.tif")))?;
    }
    save_mask(registration.mask(), &dir.join(format!("{name}_mask.png")))?;
    save_labels(registration.labels(), &dir.join(format!("{name}_labels.png")))?;
    debug!(name = %name, dir = %dir.display(), "Calibration images exported");
    Ok(())
}

/// Write Fc, G and AA mean images plus both masks and the label map of a
/// bleach pair into `dir`.
pub fn export_bleach(analysis: &BleachAnalysis, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let name = analysis.name();
    for kind in ImageKind::ALL {
        save_image(&analysis.mean_image(kind), &dir.join(format!("{name}_{kind}.tif")))?;
    }
    save_mask(analysis.mask(), &dir.join(format!("{name}_mask.png")))?;
    save_mask(analysis.wide_mask(), &dir.join(format!("{name}_wide_mask.png")))?;
    save_labels(analysis.labels(), &dir.join(format!("{name}_labels.png")))?;
    debug!(name = %name, dir = %dir.display(), "Bleach images exported");
    Ok(())
}

/// Export hook for set drivers: failures are logged, never fatal.
pub fn export_calibration_logged(registration: &SegmentedCalibration, dir: &Path) {
    if let Err(e) = export_calibration(registration, dir) {
        warn!(name = %registration.meta().name, error = %e, "Image export failed");
    }
}

pub fn export_bleach_logged(analysis: &BleachAnalysis, dir: &Path) {
    if let Err(e) = export_bleach(analysis, dir) {
        warn!(name = %analysis.name(), error = %e, "Image export failed");
    }
}
