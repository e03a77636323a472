pub mod config;
pub mod crosstalk;
pub mod gfactor;
pub mod info;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use efret_core::pipeline::config::ExperimentConfig;
use serde::Serialize;
use tracing::{debug, info};

/// Read an experiment config, letting `--export-dir` override the file.
pub fn load_experiment(path: &Path, export_dir: Option<&PathBuf>) -> Result<ExperimentConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let mut config: ExperimentConfig =
        toml::from_str(&contents).context("Invalid experiment config")?;
    if let Some(dir) = export_dir {
        debug!(export_dir = %dir.display(), "Export directory overridden");
        config.export_dir = Some(dir.clone());
    }
    info!(
        path = %path.display(),
        calibration = config.calibration.is_some(),
        bleach = config.bleach.is_some(),
        "Loaded experiment config"
    );
    Ok(config)
}

/// Serialize a report as TOML.
pub fn write_report<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let toml_str = toml::to_string_pretty(report)?;
    std::fs::write(path, &toml_str)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!(path = %path.display(), bytes = toml_str.len(), "Wrote report");
    println!("Report saved to {}", path.display());
    Ok(())
}
