use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use efret_core::pipeline::config::{
    BleachRegistrationConfig, BleachSetConfig, CalibrationEntry, CalibrationSetConfig,
    ExperimentConfig,
};
use efret_core::segmentation::SegmentationConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default ExperimentConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = ExperimentConfig {
        segmentation: SegmentationConfig::default(),
        export_dir: None,
        calibration: Some(CalibrationSetConfig {
            data_dir: PathBuf::from("calibration"),
            extension: "tif".to_string(),
            acceptors: vec![CalibrationEntry {
                name: "acceptor_01".to_string(),
                donor_exposure: 200.0,
                acceptor_exposure: 200.0,
            }],
            donors: vec![CalibrationEntry {
                name: "donor_01".to_string(),
                donor_exposure: 200.0,
                acceptor_exposure: 200.0,
            }],
            frame_limit: None,
        }),
        bleach: Some(BleachSetConfig {
            data_dir: PathBuf::from("tandem"),
            extension: "tif".to_string(),
            registrations: vec![BleachRegistrationConfig {
                name: "cell_01".to_string(),
                pre: "cell_01_pre".to_string(),
                post: "cell_01_post".to_string(),
                bleach_frame: 10,
                bleach_exposure: 1000.0,
                acceptor_exposure: 200.0,
                donor_exposure: 200.0,
                bad_rois: vec![],
            }],
            frame_limit: None,
        }),
        coefficients: None,
    };
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
