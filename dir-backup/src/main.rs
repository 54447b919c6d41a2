//! Directory Backup - Main entry point
//!
//! Copies files changed since the last run of each configured target.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dir_backup::{config::Config, utils, BackupExecutor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose diagnostic output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config_path = Config::default_path();
    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Initialize logging
    utils::logger::init(utils::logger::effective_level(args.debug, &config.log.level))?;

    tracing::info!("Starting dir-backup v{}", env!("CARGO_PKG_VERSION"));

    let targets = config
        .load_targets()
        .context("reading directory list")?;

    let executor = BackupExecutor::from_config(&config);
    let report = executor.run(&targets);

    if !report.is_success() {
        let failed: Vec<&str> = report.failures.iter().map(|(name, _)| name.as_str()).collect();
        bail!("backup failed for: {}", failed.join(", "));
    }

    Ok(())
}
