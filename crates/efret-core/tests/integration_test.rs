#[allow(dead_code)]
mod common;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use efret_core::crosstalk::{CalibrationKind, Coefficient, CrosstalkCoefficients};
use efret_core::error::FretError;
use efret_core::fret::BleachSet;
use efret_core::pipeline::config::{
    BleachRegistrationConfig, BleachSetConfig, CalibrationEntry, CalibrationSetConfig,
    ExperimentConfig,
};
use efret_core::pipeline::{run_experiment, run_experiment_reported, PipelineStage, ProgressReporter};

use common::{
    bleach_coefficients, bleach_pair_stacks, calibration_stack, small_segmentation,
    write_interleaved_tiff, write_rgba_tiff, TWO_DISKS,
};

/// Writes two calibration stacks and two bleach pairs (G = 2 and G = 3 in
/// every cell) into `dir`.
fn write_experiment(dir: &Path) {
    write_interleaved_tiff(
        &calibration_stack(CalibrationKind::Acceptor, &TWO_DISKS, 3, 0.3, 0.05),
        &dir.join("acc1.tif"),
    );
    write_interleaved_tiff(
        &calibration_stack(CalibrationKind::Donor, &TWO_DISKS, 3, 0.1, 0.2),
        &dir.join("don1.tif"),
    );
    for (name, g) in [("cell1", 2.0), ("cell2", 3.0)] {
        let (pre, post) = bleach_pair_stacks(&TWO_DISKS, 4, &[g, g]);
        write_rgba_tiff(&pre, &dir.join(format!("{name}_pre.tif")));
        write_rgba_tiff(&post, &dir.join(format!("{name}_post.tif")));
    }
}

fn calibration(dir: &Path) -> CalibrationSetConfig {
    let entry = |name: &str| CalibrationEntry {
        name: name.to_string(),
        donor_exposure: 100.0,
        acceptor_exposure: 100.0,
    };
    CalibrationSetConfig {
        data_dir: dir.to_path_buf(),
        extension: "tif".to_string(),
        acceptors: vec![entry("acc1")],
        donors: vec![entry("don1")],
        frame_limit: None,
    }
}

fn bleach(dir: &Path, names: &[&str]) -> BleachSetConfig {
    BleachSetConfig {
        data_dir: dir.to_path_buf(),
        extension: "tif".to_string(),
        registrations: names
            .iter()
            .map(|name| BleachRegistrationConfig {
                name: name.to_string(),
                pre: format!("{name}_pre"),
                post: format!("{name}_post"),
                bleach_frame: 20,
                bleach_exposure: 1000.0,
                acceptor_exposure: 100.0,
                donor_exposure: 100.0,
                bad_rois: Vec::new(),
            })
            .collect(),
        frame_limit: None,
    }
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<(PipelineStage, Option<usize>)>>,
    advanced: AtomicUsize,
    finished: AtomicUsize,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.stages.lock().unwrap().push((stage, total_items));
    }

    fn advance(&self, _items_done: usize) {
        self.advanced.fetch_add(1, Ordering::Relaxed);
    }

    fn finish_stage(&self) {
        self.finished.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_full_experiment_with_configured_coefficients() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());

    let config = ExperimentConfig {
        segmentation: small_segmentation(),
        export_dir: None,
        calibration: Some(calibration(dir.path())),
        bleach: Some(bleach(dir.path(), &["cell1", "cell2", "ghost"])),
        coefficients: Some(bleach_coefficients()),
    };
    let reporter = Arc::new(RecordingReporter::default());
    let report = run_experiment_reported(&config, reporter.clone()).unwrap();

    // Calibration still runs and reports its own averages.
    let crosstalk = report.crosstalk.unwrap();
    let derived = crosstalk.coefficients().unwrap();
    assert!((derived.a - 0.3).abs() < 1e-5);
    assert!((derived.c - 0.1).abs() < 1e-5);

    // The configured coefficients win for the bleach stage.
    assert_eq!(report.coefficients, Some(bleach_coefficients()));

    let g = report.g.unwrap();
    let names: Vec<&str> = g.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["cell1", "cell2"]);
    assert!((g.rows[0].g() - 2.0).abs() < 1e-4);
    assert!((g.rows[1].g() - 3.0).abs() < 1e-4);
    assert_eq!(g.rows[0].regions, 2);
    assert_eq!(g.failures.len(), 1);
    assert_eq!(g.failures[0].name, "ghost");

    let (mean, sd) = g.mean_g();
    assert!((mean - 2.5).abs() < 1e-4);
    assert!((sd - 0.5).abs() < 1e-4);

    let stages = reporter.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        vec![
            (PipelineStage::Calibration, Some(2)),
            (PipelineStage::BleachAnalysis, Some(3)),
        ]
    );
    assert_eq!(reporter.advanced.load(Ordering::Relaxed), 5);
    assert_eq!(reporter.finished.load(Ordering::Relaxed), 2);
}

#[test]
fn test_bleach_uses_calibration_average() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());

    let config = ExperimentConfig {
        segmentation: small_segmentation(),
        calibration: Some(calibration(dir.path())),
        bleach: Some(bleach(dir.path(), &["cell1"])),
        ..Default::default()
    };
    let report = run_experiment(&config).unwrap();

    let k = report.coefficients.unwrap();
    assert!((k.a - 0.3).abs() < 1e-5);
    assert!((k.b - 0.05).abs() < 1e-5);
    assert!((k.c - 0.1).abs() < 1e-5);
    assert!((k.d - 0.2).abs() < 1e-5);

    let g = report.g.unwrap();
    assert_eq!(g.rows.len(), 1);
    assert!(g.rows[0].g().is_finite());
}

#[test]
fn test_bleach_without_coefficients_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ExperimentConfig {
        bleach: Some(bleach(dir.path(), &["cell1"])),
        ..Default::default()
    };
    assert!(matches!(run_experiment(&config), Err(FretError::Pipeline(_))));
}

#[test]
fn test_missing_donor_calibration_keeps_crosstalk_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());

    let mut calibration = calibration(dir.path());
    calibration.donors[0].name = "missing".to_string();
    let config = ExperimentConfig {
        segmentation: small_segmentation(),
        calibration: Some(calibration),
        bleach: Some(bleach(dir.path(), &["cell1"])),
        ..Default::default()
    };
    let report = run_experiment(&config).unwrap();

    let crosstalk = report.crosstalk.unwrap();
    let coefficients: Vec<Coefficient> = crosstalk.summary.iter().map(|e| e.coefficient).collect();
    assert_eq!(coefficients, vec![Coefficient::A, Coefficient::B]);
    assert!(crosstalk.summary.iter().all(|e| e.meta.name == "acc1"));
    assert_eq!(crosstalk.failures.len(), 1);
    assert_eq!(crosstalk.failures[0].name, "missing");

    assert!(report.g.is_none());
    assert!(report.coefficients.is_none());
    let message = report.bleach_error.unwrap();
    assert!(message.contains("missing from the crosstalk summary"), "{message}");
}

#[test]
fn test_empty_experiment_fails() {
    let config = ExperimentConfig::default();
    assert!(matches!(run_experiment(&config), Err(FretError::Pipeline(_))));
}

#[test]
fn test_calibration_only_experiment() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());

    let config = ExperimentConfig {
        segmentation: small_segmentation(),
        calibration: Some(calibration(dir.path())),
        ..Default::default()
    };
    let report = run_experiment(&config).unwrap();
    assert!(report.g.is_none());
    let k = report.coefficients.unwrap();
    assert!((k.b - 0.05).abs() < 1e-5);
}

#[test]
fn test_export_writes_images() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());
    let out = dir.path().join("export");

    let config = ExperimentConfig {
        segmentation: small_segmentation(),
        export_dir: Some(out.clone()),
        calibration: Some(calibration(dir.path())),
        bleach: Some(bleach(dir.path(), &["cell1"])),
        coefficients: Some(CrosstalkCoefficients::new(0.1, 0.0, 0.0, 0.2)),
    };
    run_experiment(&config).unwrap();

    for file in [
        "acc1_DD.tif",
        "acc1_AA.tif",
        "acc1_mask.png",
        "acc1_labels.png",
        "don1_mask.png",
        "cell1_fc_pre.tif",
        "cell1_fc_post.tif",
        "cell1_g.tif",
        "cell1_aa.tif",
        "cell1_mask.png",
        "cell1_wide_mask.png",
        "cell1_labels.png",
    ] {
        assert!(out.join(file).exists(), "missing {file}");
    }
}

#[test]
fn test_bleach_set_analyze_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write_experiment(dir.path());

    let set = BleachSet::new(
        bleach(dir.path(), &["cell2"]),
        small_segmentation(),
        bleach_coefficients(),
    );
    let registration = &set.config().registrations[0];
    let analysis = set.analyze(registration).unwrap();
    assert_eq!(analysis.name(), "cell2");
    assert_eq!(analysis.labels().count(), 2);
    let fit = analysis.fit_g_pixels(0, &[]).unwrap();
    assert!((fit.slope - 3.0).abs() < 1e-4);
}
