//! Vigil CLI
//!
//! Watches a status document and posts what changed to chat channels.

use clap::{Parser, Subcommand};
use vigil_core::errors::{VgError, VgErrorKind};

mod commands;

/// Exit status for fatal startup errors
const EXIT_FATAL: i32 = 1;
/// Exit status when no adapter could be registered
const EXIT_NO_ADAPTERS: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "vigil", version)]
#[command(about = "Vigil - status diff and notification service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the monitoring service until interrupted
    Run(commands::run::RunArgs),
    /// Validate the configuration and the current snapshot
    Check(commands::check::CheckArgs),
    /// Compare two snapshot documents
    Diff(commands::diff::DiffArgs),
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<VgError>() {
        Some(vg) if vg.kind() == VgErrorKind::NoUsableAdapters => EXIT_NO_ADAPTERS,
        _ => EXIT_FATAL,
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Check(args) => commands::check::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}
