//! tiercoord - layered cache and resource coordination daemon
//!
//! Loads the engine configuration, starts every background loop and logs
//! coordination analytics until interrupted.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tiercoord::utils::logging::{LogLevel, init_logging};
use tiercoord::{Config, ResourceEngine};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "tiercoord", version, about)]
struct Args {
    /// YAML configuration file; environment variables are used when absent
    #[arg(short, long, env = "TIERCOORD_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, env = "TIERCOORD_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Emit JSON log lines
    #[arg(long, env = "TIERCOORD_JSON_LOGS")]
    json_logs: bool,

    /// Seconds between analytics reports
    #[arg(long, env = "TIERCOORD_REPORT_INTERVAL", default_value_t = 60)]
    report_interval: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };
    if let Some(level) = args.log_level {
        config.engine.logging.level = level;
    }
    config.engine.logging.json |= args.json_logs;
    init_logging(config.logging());

    let engine: ResourceEngine<serde_json::Value> =
        ResourceEngine::new(config).context("building engine")?;
    let mut tasks = engine.start();

    let coordinator = engine.coordinator().clone();
    let resolver = engine.resolver().clone();
    tasks.spawn_periodic(
        "analytics_report",
        Duration::from_secs(args.report_interval.max(1)),
        move || {
            let coordinator = coordinator.clone();
            let resolver = resolver.clone();
            async move {
                let report = serde_json::json!({
                    "coordination": coordinator.get_coordination_analytics(),
                    "resources": resolver.get_resource_stats(),
                });
                info!(report = %report, "Engine report");
            }
        },
    );

    info!(version = tiercoord::VERSION, "tiercoord running, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    tasks.shutdown().await;
    Ok(())
}
