mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "efret", about = "FRET crosstalk and G-factor estimation")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for parallel processing (default: all cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show layout and channel intensities of a TIFF stack
    Info(commands::info::InfoArgs),
    /// Estimate crosstalk coefficients from calibration registrations
    Crosstalk(commands::crosstalk::CrosstalkArgs),
    /// Estimate G from pre/post photobleaching pairs
    Gfactor(commands::gfactor::GfactorArgs),
    /// Run calibration, then G estimation with the derived coefficients
    Run(commands::run::RunArgs),
    /// Print a default experiment config as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Crosstalk(args) => commands::crosstalk::run(args),
        Commands::Gfactor(args) => commands::gfactor::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
