use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crosstalk::{CrosstalkCoefficients, RegistrationFailure};
use crate::error::Result;
use crate::frame::ImageStack;
use crate::io::load_stack_limited;
use crate::pipeline::config::{BleachRegistrationConfig, BleachSetConfig};
use crate::pipeline::{NoOpReporter, PipelineStage, ProgressReporter};
use crate::segmentation::SegmentationConfig;
use crate::stats::{mean_sd, LinearFit};

use super::bleach::{analyze_pair, BleachAnalysis, BleachPair};

/// G estimated for one bleach pair from the frame-wise regression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GEstimate {
    pub name: String,
    pub bleach_frame: usize,
    pub bleach_exposure: f64,
    pub acceptor_exposure: f64,
    pub donor_exposure: f64,
    pub regions: usize,
    pub fit: LinearFit,
}

impl GEstimate {
    /// The sensitization factor itself (slope of the fit).
    pub fn g(&self) -> f64 {
        self.fit.slope
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GReport {
    pub rows: Vec<GEstimate>,
    pub failures: Vec<RegistrationFailure>,
}

impl GReport {
    pub fn from_results(results: Vec<(String, Result<GEstimate>)>) -> Self {
        let mut report = Self::default();
        for (name, result) in results {
            match result {
                Ok(row) => report.rows.push(row),
                Err(e) => {
                    warn!(name = %name, error = %e, "Bleach registration failed");
                    report.failures.push(RegistrationFailure {
                        name,
                        message: e.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Mean and population sd of G over the successful pairs.
    pub fn mean_g(&self) -> (f64, f64) {
        let values: Vec<f64> = self.rows.iter().map(GEstimate::g).collect();
        mean_sd(&values)
    }
}

fn estimate_from(registration: &BleachRegistrationConfig, analysis: &BleachAnalysis) -> Result<GEstimate> {
    let fit = analysis.fit_g_frames(&registration.bad_rois)?;
    Ok(GEstimate {
        name: registration.name.clone(),
        bleach_frame: registration.bleach_frame,
        bleach_exposure: registration.bleach_exposure,
        acceptor_exposure: registration.acceptor_exposure,
        donor_exposure: registration.donor_exposure,
        regions: analysis.labels().count(),
        fit,
    })
}

/// Analyse one bleach pair and fit G frame-wise, excluding its bad ROIs.
pub fn process_bleach(
    registration: &BleachRegistrationConfig,
    pre: ImageStack,
    post: ImageStack,
    coefficients: CrosstalkCoefficients,
    config: &SegmentationConfig,
) -> Result<GEstimate> {
    let pair = BleachPair::new(registration.name.clone(), pre, post, coefficients)?;
    estimate_from(registration, &analyze_pair(pair, config))
}

/// G driver over every bleach pair of one data directory.
#[derive(Clone, Debug)]
pub struct BleachSet {
    config: BleachSetConfig,
    segmentation: SegmentationConfig,
    coefficients: CrosstalkCoefficients,
}

impl BleachSet {
    pub fn new(
        config: BleachSetConfig,
        segmentation: SegmentationConfig,
        coefficients: CrosstalkCoefficients,
    ) -> Self {
        Self {
            config,
            segmentation,
            coefficients,
        }
    }

    pub fn config(&self) -> &BleachSetConfig {
        &self.config
    }

    /// Load both stacks of a registration and run every stage.
    pub fn analyze(&self, registration: &BleachRegistrationConfig) -> Result<BleachAnalysis> {
        let limit = self.config.frame_limit;
        let pre = load_stack_limited(&self.config.stack_path(&registration.pre), limit)?;
        let post = load_stack_limited(&self.config.stack_path(&registration.post), limit)?;
        let pair = BleachPair::new(registration.name.clone(), pre, post, self.coefficients)?;
        Ok(analyze_pair(pair, &self.segmentation))
    }

    pub fn run(&self) -> GReport {
        self.run_reported(&NoOpReporter)
    }

    pub fn run_reported(&self, reporter: &dyn ProgressReporter) -> GReport {
        self.run_inspected(reporter, |_| {})
    }

    /// Process every pair, recording failures. `inspect` sees each analysed
    /// pair before the G fit, from rayon worker threads.
    pub fn run_inspected<F>(&self, reporter: &dyn ProgressReporter, inspect: F) -> GReport
    where
        F: Fn(&BleachAnalysis) + Sync,
    {
        let registrations = &self.config.registrations;
        reporter.begin_stage(PipelineStage::BleachAnalysis, Some(registrations.len()));
        info!(
            pairs = registrations.len(),
            coefficients = %self.coefficients,
            "Processing bleach set"
        );

        let done = AtomicUsize::new(0);
        let results = registrations
            .par_iter()
            .map(|registration| {
                let result = self.analyze(registration).and_then(|analysis| {
                    inspect(&analysis);
                    estimate_from(registration, &analysis)
                });
                reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
                (registration.name.clone(), result)
            })
            .collect();

        reporter.finish_stage();
        let report = GReport::from_results(results);
        info!(
            estimates = report.rows.len(),
            failures = report.failures.len(),
            "Bleach set complete"
        );
        report
    }
}
