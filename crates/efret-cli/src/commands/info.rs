use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use efret_core::io::tiff_stack::{channel_means, load_stack_with_info};

#[derive(Args)]
pub struct InfoArgs {
    /// Input multi-page TIFF stack
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let (stack, info) = load_stack_with_info(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Pages:       {}", info.pages);
    println!("Frames:      {}", info.frames);
    println!("Dimensions:  {}x{}", info.width, info.height);
    println!("Samples/px:  {}", info.samples_per_pixel);

    for (channel, mean) in channel_means(&stack) {
        println!("Mean {:<7}{:.1}", format!("{channel}:"), mean);
    }

    let total_mb = (stack.frame_count() * stack.height() * stack.width() * 4 * 2) as f64
        / (1024.0 * 1024.0);
    println!("Data size:   {:.1} MB", total_mb);

    Ok(())
}
