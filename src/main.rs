// =============================================================================
// CSE Signals — Main Entry Point
// =============================================================================
//
// `run` computes every table from the configured input files and writes them
// to the output directory. `serve` does the same once at startup and then
// exposes the tables over the read-only REST API, with `POST /api/v1/refresh`
// to recompute on demand. `init-config` writes the resolved configuration
// to the `--config` path as a starting point for editing.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod coverage;
mod errors;
mod indicators;
mod market_data;
mod output;
mod pipeline;
mod resample;
mod runtime_config;
mod signals;
mod snapshot;
mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;

#[derive(Parser)]
#[command(name = "cse-signals")]
#[command(about = "Indicator tables, weekly trend snapshots and a ranked watchlist for CSE equities")]
struct Cli {
    /// Pipeline config file (JSON); defaults are used when it is missing
    #[arg(long, global = true, env = "CSE_CONFIG", default_value = "pipeline_config.json")]
    config: PathBuf,

    /// Raw daily price rows (JSON array)
    #[arg(long, global = true, env = "CSE_RAW_PRICES")]
    raw_prices: Option<PathBuf>,

    /// Company master (JSON array of {symbol, company_name})
    #[arg(long, global = true, env = "CSE_COMPANY_MASTER")]
    company_master: Option<PathBuf>,

    /// Directory receiving the derived tables
    #[arg(long, global = true, env = "CSE_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Compute instruments one at a time
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and write every table once
    Run,
    /// Compute once, then serve the tables over HTTP
    Serve {
        /// Listen address
        #[arg(long, env = "CSE_BIND_ADDR")]
        bind: Option<String>,
    },
    /// Write the resolved configuration to the --config path
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    fn resolve_config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::load(&self.config).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            RuntimeConfig::default()
        });

        if let Some(path) = &self.raw_prices {
            config.raw_prices_path = path.clone();
        }
        if let Some(path) = &self.company_master {
            config.company_master_path = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.sequential {
            config.parallel = false;
        }
        if let Commands::Serve { bind: Some(addr) } = &self.command {
            config.bind_addr = addr.clone();
        }
        config
    }
}

fn run_once(config: &RuntimeConfig) -> anyhow::Result<pipeline::PipelineOutput> {
    let output = pipeline::run_from_files(config)?;
    output::write_tables(&config.output_dir, &output)?;
    Ok(output)
}

fn init_config(path: &Path, config: &RuntimeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (pass --force to replace it)", path.display());
    }
    config.save(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config();

    info!(
        raw_prices = %config.raw_prices_path.display(),
        company_master = %config.company_master_path.display(),
        output_dir = %config.output_dir.display(),
        parallel = config.parallel,
        "CSE Signals starting"
    );

    match cli.command {
        Commands::InitConfig { force } => {
            init_config(&cli.config, &config, force)?;
        }

        // ── 2a. Batch run ────────────────────────────────────────────────
        Commands::Run => {
            let output = tokio::task::spawn_blocking(move || run_once(&config))
                .await
                .context("pipeline task panicked")??;

            for failure in &output.failures {
                warn!(
                    instrument = %failure.instrument_id,
                    frequency = %failure.frequency,
                    error = %failure.error,
                    "excluded from this run"
                );
            }
            info!(
                digest = %output.digest,
                watchlist = output.watchlist.len(),
                "run complete"
            );
        }

        // ── 2b. API server ───────────────────────────────────────────────
        Commands::Serve { .. } => {
            let bind_addr = config.bind_addr.clone();
            let state = Arc::new(AppState::new(config.clone()));

            match tokio::task::spawn_blocking(move || run_once(&config)).await? {
                Ok(output) => {
                    state.publish(output);
                }
                Err(e) => {
                    error!(error = %e, "Initial pipeline run failed, serving without tables");
                    state.record_error(format!("{e:#}"));
                }
            }

            let app = api::rest::router(state);
            let listener = tokio::net::TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
            info!(addr = %bind_addr, "API server listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    warn!("Shutdown signal received, stopping gracefully");
                })
                .await
                .context("API server failed")?;
        }
    }

    Ok(())
}
