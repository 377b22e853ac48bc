use anyhow::Result;
use bufshrew_cli::{run, Args};
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    // Initialize logger with timestamp
    env_logger::builder().format_timestamp_secs().init();

    let args = Args::parse();
    info!("Running {} from {}", args.entry, args.module.display());

    let summary = run(&args)?;
    info!(
        "Done: {} reads ({} bytes), {} writes ({} bytes)",
        summary.stats.reads,
        summary.stats.bytes_read,
        summary.stats.writes,
        summary.stats.bytes_written
    );
    Ok(())
}
