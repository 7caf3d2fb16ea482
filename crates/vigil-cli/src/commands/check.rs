//! `vigil check`

use std::path::PathBuf;

use clap::Args;
use vigil_core::errors::{VgError, VgErrorKind};
use vigil_store::snapshot::load_snapshot_file;
use vigil_store::Config;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: PathBuf,
}

pub fn execute(args: CheckArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;

    let enabled: Vec<String> = config
        .enabled_adapters()
        .map(|a| format!("{} ({}, {})", a.name, a.kind.as_str(), a.mode))
        .collect();
    println!("Config OK: {}", args.config.display());
    for line in &enabled {
        println!("  adapter {line}");
    }

    let snapshot = load_snapshot_file(&config.snapshot_path)?;
    let now = chrono::Utc::now();
    println!(
        "Snapshot OK: {} facilities, overall status {} (generated {})",
        snapshot.facilities().len(),
        snapshot.overall_status(config.status.include_hidden).caption(),
        snapshot.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    if snapshot.is_outdated(now) {
        println!(
            "  outdated: a refresh was expected at {}",
            snapshot.next_refresh().format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    if enabled.is_empty() {
        return Err(VgError::new(VgErrorKind::NoUsableAdapters)
            .with_op("check")
            .with_message("every adapter is disabled")
            .into());
    }
    Ok(())
}
