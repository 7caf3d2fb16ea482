//! `vigil diff`

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use vigil_core::compute_change_set;
use vigil_core::diff::render_human_summary;
use vigil_store::snapshot::load_snapshot_file;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Earlier snapshot document
    pub previous: PathBuf,
    /// Later snapshot document
    pub current: PathBuf,
    /// Print the change set as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: DiffArgs) -> anyhow::Result<()> {
    let previous = load_snapshot_file(&args.previous)?;
    let current = load_snapshot_file(&args.current)?;
    let change_set = compute_change_set(Some(&previous), &current)?;

    if args.json {
        let text = serde_json::to_string_pretty(&change_set)
            .context("Failed to serialize the change set")?;
        println!("{text}");
    } else {
        print!("{}", render_human_summary(&change_set));
    }
    Ok(())
}
