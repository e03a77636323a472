use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use efret_core::crosstalk::CrosstalkSet;
use efret_core::io::export::export_calibration_logged;

use crate::progress::BarReporter;
use crate::summary::print_crosstalk_report;

use super::{load_experiment, write_report};

#[derive(Args)]
pub struct CrosstalkArgs {
    /// Experiment config file (TOML) with a [calibration] section
    pub config: PathBuf,

    /// Write the coefficient tables as TOML
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for mean images, masks and label maps
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

pub fn run(args: &CrosstalkArgs) -> Result<()> {
    let config = load_experiment(&args.config, args.export_dir.as_ref())?;
    let Some(calibration) = config.calibration else {
        bail!("{} has no [calibration] section", args.config.display());
    };

    let set = CrosstalkSet::new(calibration, config.segmentation);
    let reporter = BarReporter::new()?;
    let report = match config.export_dir {
        Some(ref dir) => set.run_inspected(&reporter, |r| export_calibration_logged(r, dir)),
        None => set.run_reported(&reporter),
    };

    print_crosstalk_report(&report);

    if let Some(ref path) = args.output {
        write_report(&report, path)?;
    }
    if report.summary.is_empty() {
        bail!("no calibration registration could be processed");
    }
    Ok(())
}
