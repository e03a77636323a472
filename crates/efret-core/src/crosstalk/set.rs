use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::frame::ImageStack;
use crate::io::load_stack_limited;
use crate::pipeline::config::CalibrationSetConfig;
use crate::pipeline::{NoOpReporter, PipelineStage, ProgressReporter};
use crate::segmentation::SegmentationConfig;

use super::coefficients::{
    CoefficientEstimate, CoefficientSample, CrosstalkCoefficients, CrosstalkEstimate,
};
use super::registration::{CalibrationRegistration, RegistrationMeta, SegmentedCalibration};

/// A registration that could not be processed, and why.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub name: String,
    pub message: String,
}

/// Tables produced by a calibration set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrosstalkReport {
    /// One row per registration, coefficient and frame.
    pub raw: Vec<CoefficientSample>,
    /// One row per registration and coefficient.
    pub summary: Vec<CoefficientEstimate>,
    pub failures: Vec<RegistrationFailure>,
}

impl CrosstalkReport {
    /// Collect per-registration outcomes, keeping their order.
    pub fn from_results(results: Vec<(RegistrationMeta, Result<CrosstalkEstimate>)>) -> Self {
        let mut report = Self::default();
        for (meta, result) in results {
            match result {
                Ok(estimate) => {
                    report.raw.extend(estimate.raw_samples());
                    report.summary.extend(estimate.summary());
                }
                Err(e) => {
                    warn!(name = %meta.name, error = %e, "Calibration registration failed");
                    report.failures.push(RegistrationFailure {
                        name: meta.name,
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Average a, b, c and d over every registration that estimated them.
    pub fn coefficients(&self) -> Result<CrosstalkCoefficients> {
        CrosstalkCoefficients::from_estimates(&self.summary)
    }
}

/// Run one calibration registration through every stage.
pub fn process_calibration(
    meta: RegistrationMeta,
    stack: ImageStack,
    config: &SegmentationConfig,
) -> Result<CrosstalkEstimate> {
    CalibrationRegistration::new(meta, stack)
        .correct_background()
        .segment(config)
        .estimate()
}

/// Process in-memory registrations in parallel, keeping input order.
pub fn process_stacks(
    registrations: Vec<(RegistrationMeta, ImageStack)>,
    config: &SegmentationConfig,
) -> CrosstalkReport {
    let results = registrations
        .into_par_iter()
        .map(|(meta, stack)| {
            let result = process_calibration(meta.clone(), stack, config);
            (meta, result)
        })
        .collect();
    CrosstalkReport::from_results(results)
}

/// Calibration driver: acceptor-only then donor-only registrations loaded
/// from one data directory.
#[derive(Clone, Debug)]
pub struct CrosstalkSet {
    config: CalibrationSetConfig,
    segmentation: SegmentationConfig,
}

impl CrosstalkSet {
    pub fn new(config: CalibrationSetConfig, segmentation: SegmentationConfig) -> Self {
        Self {
            config,
            segmentation,
        }
    }

    pub fn config(&self) -> &CalibrationSetConfig {
        &self.config
    }

    pub fn run(&self) -> CrosstalkReport {
        self.run_reported(&NoOpReporter)
    }

    pub fn run_reported(&self, reporter: &dyn ProgressReporter) -> CrosstalkReport {
        self.run_inspected(reporter, |_| {})
    }

    /// Load and process every registration. A failing registration is
    /// recorded in the report and the rest continue.
    ///
    /// `inspect` sees every segmented registration before estimation, from
    /// rayon worker threads.
    pub fn run_inspected<F>(&self, reporter: &dyn ProgressReporter, inspect: F) -> CrosstalkReport
    where
        F: Fn(&SegmentedCalibration) + Sync,
    {
        let registrations = self.config.registrations();
        reporter.begin_stage(PipelineStage::Calibration, Some(registrations.len()));
        info!(
            acceptors = self.config.acceptors.len(),
            donors = self.config.donors.len(),
            "Processing calibration set"
        );

        let done = AtomicUsize::new(0);
        let results = registrations
            .into_par_iter()
            .map(|meta| {
                let path = self.config.stack_path(&meta.name);
                let result = load_stack_limited(&path, self.config.frame_limit).and_then(|stack| {
                    let segmented = CalibrationRegistration::new(meta.clone(), stack)
                        .correct_background()
                        .segment(&self.segmentation);
                    inspect(&segmented);
                    segmented.estimate()
                });
                reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
                (meta, result)
            })
            .collect();

        reporter.finish_stage();
        let report = CrosstalkReport::from_results(results);
        info!(
            estimates = report.summary.len(),
            failures = report.failures.len(),
            "Calibration set complete"
        );
        report
    }
}
