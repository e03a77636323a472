use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use efret_core::crosstalk::CrosstalkCoefficients;
use efret_core::fret::BleachSet;
use efret_core::io::export::export_bleach_logged;

use crate::progress::BarReporter;
use crate::summary::{print_coefficients, print_g_report};

use super::{load_experiment, write_report};

#[derive(Args)]
pub struct GfactorArgs {
    /// Experiment config file (TOML) with a [bleach] section
    pub config: PathBuf,

    /// Comma-separated crosstalk coefficients a,b,c,d (overrides the config)
    #[arg(long)]
    pub coefficients: Option<String>,

    /// Write the G table as TOML
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for Fc/G mean images, masks and label maps
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

fn parse_coefficients(raw: &str) -> Result<CrosstalkCoefficients> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid coefficient list '{raw}'"))?;
    let &[a, b, c, d] = values.as_slice() else {
        bail!("expected 4 coefficients a,b,c,d, got {}", values.len());
    };
    Ok(CrosstalkCoefficients::new(a, b, c, d))
}

pub fn run(args: &GfactorArgs) -> Result<()> {
    let config = load_experiment(&args.config, args.export_dir.as_ref())?;
    let Some(bleach) = config.bleach else {
        bail!("{} has no [bleach] section", args.config.display());
    };
    let coefficients = match args.coefficients {
        Some(ref raw) => parse_coefficients(raw)?,
        None => config.coefficients.context(
            "G estimation needs [coefficients] in the config or --coefficients a,b,c,d",
        )?,
    };
    print_coefficients(&coefficients);

    let set = BleachSet::new(bleach, config.segmentation, coefficients);
    let reporter = BarReporter::new()?;
    let report = match config.export_dir {
        Some(ref dir) => set.run_inspected(&reporter, |a| export_bleach_logged(a, dir)),
        None => set.run_reported(&reporter),
    };

    print_g_report(&report);

    if let Some(ref path) = args.output {
        write_report(&report, path)?;
    }
    if report.rows.is_empty() {
        bail!("no bleach pair could be processed");
    }
    Ok(())
}
