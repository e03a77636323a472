use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crosstalk::{CrosstalkCoefficients, CrosstalkReport, CrosstalkSet};
use crate::error::{FretError, Result};
use crate::fret::{BleachSet, GReport};
use crate::io::export::{export_bleach_logged, export_calibration_logged};

use super::config::ExperimentConfig;
use super::types::{NoOpReporter, ProgressReporter};

/// Everything an experiment produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub crosstalk: Option<CrosstalkReport>,
    /// Coefficients used for the bleach analysis, if one ran.
    pub coefficients: Option<CrosstalkCoefficients>,
    pub g: Option<GReport>,
    /// Why a configured bleach set was not analysed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleach_error: Option<String>,
}

/// Resolve the coefficients for the bleach stage: the manual override wins,
/// then the calibration average.
fn resolve_coefficients(
    config: &ExperimentConfig,
    crosstalk: Option<&CrosstalkReport>,
) -> Result<CrosstalkCoefficients> {
    if let Some(manual) = config.coefficients {
        info!(coefficients = %manual, "Using configured coefficients");
        return Ok(manual);
    }
    match crosstalk {
        Some(report) => report.coefficients(),
        None => Err(FretError::Pipeline(
            "bleach analysis needs either a calibration set or explicit coefficients".to_string(),
        )),
    }
}

/// Run calibration (if configured) then bleach analysis (if configured).
///
/// Failing registrations are recorded in the report, and so is a calibration
/// that leaves the bleach stage without coefficients. Only a configuration
/// that cannot run at all is an error.
pub fn run_experiment_reported(
    config: &ExperimentConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<ExperimentReport> {
    if config.calibration.is_none() && config.bleach.is_none() {
        return Err(FretError::Pipeline(
            "experiment configures neither a calibration nor a bleach set".to_string(),
        ));
    }
    if config.calibration.is_none() && config.coefficients.is_none() {
        // Nothing upstream could supply the coefficients.
        resolve_coefficients(config, None)?;
    }

    let mut report = ExperimentReport::default();

    if let Some(ref calibration) = config.calibration {
        let set = CrosstalkSet::new(calibration.clone(), config.segmentation.clone());
        let crosstalk = match config.export_dir.as_deref() {
            Some(dir) => set.run_inspected(reporter.as_ref(), |r| export_calibration_logged(r, dir)),
            None => set.run_reported(reporter.as_ref()),
        };
        report.crosstalk = Some(crosstalk);
    }

    if let Some(ref bleach) = config.bleach {
        match resolve_coefficients(config, report.crosstalk.as_ref()) {
            Ok(coefficients) => {
                info!(coefficients = %coefficients, "Starting bleach analysis");
                let set = BleachSet::new(bleach.clone(), config.segmentation.clone(), coefficients);
                let g = match config.export_dir.as_deref() {
                    Some(dir) => {
                        set.run_inspected(reporter.as_ref(), |a| export_bleach_logged(a, dir))
                    }
                    None => set.run_reported(reporter.as_ref()),
                };
                report.g = Some(g);
                report.coefficients = Some(coefficients);
            }
            Err(e) => {
                warn!(error = %e, "Skipping bleach analysis");
                report.bleach_error = Some(e.to_string());
            }
        }
    } else if let Some(ref crosstalk) = report.crosstalk {
        report.coefficients = crosstalk.coefficients().ok();
    }

    Ok(report)
}

/// Run the experiment without progress reporting.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentReport> {
    run_experiment_reported(config, Arc::new(NoOpReporter))
}
