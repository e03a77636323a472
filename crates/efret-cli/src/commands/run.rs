use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use efret_core::pipeline::run_experiment_reported;

use crate::progress::BarReporter;
use crate::summary::{
    print_bleach_error, print_coefficients, print_crosstalk_report, print_experiment_summary,
    print_g_report,
};

use super::{load_experiment, write_report};

#[derive(Args)]
pub struct RunArgs {
    /// Experiment config file (TOML)
    pub config: PathBuf,

    /// Write every table as TOML
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for mean images, masks and label maps
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = load_experiment(&args.config, args.export_dir.as_ref())?;
    print_experiment_summary(&config);

    let reporter = Arc::new(BarReporter::new()?);
    let report = run_experiment_reported(&config, reporter)?;

    if let Some(ref crosstalk) = report.crosstalk {
        print_crosstalk_report(crosstalk);
    }
    match (&report.g, &report.coefficients) {
        (Some(g), Some(k)) => {
            print_coefficients(k);
            print_g_report(g);
        }
        (Some(g), None) => print_g_report(g),
        _ => {}
    }
    if let Some(ref message) = report.bleach_error {
        print_bleach_error(message);
    }

    if let Some(ref path) = args.output {
        write_report(&report, path)?;
    }
    if let Some(ref dir) = config.export_dir {
        println!("Images exported to {}", dir.display());
    }
    if let Some(message) = report.bleach_error {
        bail!("Bleach analysis skipped: {message}");
    }
    Ok(())
}
