//! `vigil run`

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use vigil_core::logging_facility::{self, Profile};
use vigil_engine::{build_registrations, Orchestrator, OrchestratorSettings, WatchSource};
use vigil_store::{Config, SnapshotStore, SnapshotWatcher};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogProfile {
    Development,
    Production,
}

impl From<LogProfile> for Profile {
    fn from(profile: LogProfile) -> Self {
        match profile {
            LogProfile::Development => Profile::Development,
            LogProfile::Production => Profile::Production,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long)]
    pub config: PathBuf,

    #[arg(long, value_enum, default_value = "development")]
    pub log_profile: LogProfile,
}

pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    logging_facility::init(args.log_profile.into());

    let config = Config::load(&args.config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let registrations = build_registrations(&config);
    let orchestrator = Orchestrator::initialize(
        SnapshotStore::new(&config.snapshot_path),
        OrchestratorSettings::from_config(&config),
        registrations,
    )
    .await?;

    let source = WatchSource::new(SnapshotWatcher::from_config(
        &config.snapshot_path,
        &config.watch,
    ));
    orchestrator.run(source, shutdown_signal()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown requested");
}
