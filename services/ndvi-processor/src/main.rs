//! VIIRS NDVI processor service.
//!
//! Turns downlinked VIIRS swath directories into georeferenced swath
//! rasters, cloud-masked NDVI, maximum-value composites and composite
//! dynamics, keeping track of what has been produced in SQLite so each
//! pass only does new work.

mod config;
mod inspect;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use pipeline::{Collaborators, Pipeline, PipelineContext, Shutdown};
use pipeline_state::PipelineState;
use raster_io::GeoTiffStore;
use tokio::sync::broadcast;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use viirs_common::{RasterStore, SwathReader};
use viirs_h5::H5SwathReader;

use config::ProcessorConfig;

#[derive(Parser, Debug)]
#[command(name = "ndvi-processor")]
#[command(about = "VIIRS swath georeferencing, NDVI composites and dynamics")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "NDVI_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the swath directories
    #[arg(long, env = "VIIRS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory for produced rasters
    #[arg(long, env = "NDVI_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// SQLite state database
    #[arg(long, env = "NDVI_STATE_DB")]
    state_db: Option<PathBuf>,

    /// Concurrent swath workers
    #[arg(long, env = "NDVI_WORKERS")]
    workers: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process new swaths, then update composites and dynamics
    Run {
        /// Run once and exit (vs continuous polling)
        #[arg(long)]
        once: bool,

        /// Seconds between passes
        #[arg(long, env = "NDVI_INTERVAL_SECS", default_value = "600")]
        interval_secs: u64,

        /// Reference date (YYYY-MM-DD) composite windows end at; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Expose Prometheus metrics on this port
        #[arg(long, env = "METRICS_PORT")]
        metrics_port: Option<u16>,
    },
    /// List the filesets found in the data directory
    Analyze {
        /// Also list band files
        #[arg(long)]
        bands: bool,
    },
    /// Print every persisted record
    State,
    /// Forget every persisted record
    Reset,
}

/// Production I/O: HDF5 granules in, GeoTIFFs out.
struct ProductionCollaborators;

impl Collaborators for ProductionCollaborators {
    fn swath_reader(&self) -> Box<dyn SwathReader> {
        Box::new(H5SwathReader::new())
    }

    fn raster_store(&self) -> Box<dyn RasterStore> {
        Box::new(GeoTiffStore::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        state_db = %config.state_db_path().display(),
        "Loaded configuration"
    );

    match args.command {
        Command::Analyze { bands } => {
            inspect::analyze(&config.data_dir, config.geoloc_preference, bands)?;
        }
        Command::State => {
            let state = open_state(&config).await?;
            inspect::print_state(&state).await?;
        }
        Command::Reset => {
            let state = open_state(&config).await?;
            state.reset().await?;
            info!("State reset");
        }
        Command::Run {
            once,
            interval_secs,
            date,
            metrics_port,
        } => {
            if let Some(port) = metrics_port {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(([0, 0, 0, 0], port))
                    .install()
                    .context("Failed to install Prometheus exporter")?;
                info!(port, "Prometheus metrics exporter initialized");
            }
            run(&config, once, Duration::from_secs(interval_secs), date).await?;
        }
    }

    Ok(())
}

/// Config file first, then flags and environment on top.
fn load_config(args: &Args) -> Result<ProcessorConfig> {
    let mut config = match &args.config {
        Some(path) => ProcessorConfig::load(path)?,
        None => ProcessorConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(path) = &args.state_db {
        config.state_db = Some(path.clone());
    }
    if let Some(workers) = args.workers {
        config.workers = Some(workers);
    }
    config.validate()?;
    Ok(config)
}

async fn open_state(config: &ProcessorConfig) -> Result<PipelineState> {
    let path = config.state_db_path();
    PipelineState::open(&path)
        .await
        .with_context(|| format!("Failed to open state database {:?}", path))
}

async fn run(
    config: &ProcessorConfig,
    once: bool,
    interval: Duration,
    date: Option<NaiveDate>,
) -> Result<()> {
    tokio::fs::create_dir_all(&config.output_dir).await?;
    let state = open_state(config).await?;
    let ctx = PipelineContext::new(
        config.to_pipeline_config(),
        state,
        Arc::new(ProductionCollaborators),
    )?;
    let pipeline = Pipeline::new(ctx);

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut shutdown = Shutdown::new(shutdown_tx.subscribe());

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    loop {
        let reference_date = date.unwrap_or_else(|| Utc::now().date_naive());
        info!(%reference_date, "Starting pass");

        match pipeline.run_once(reference_date, &mut shutdown).await {
            Ok(report) => {
                println!("{}", report);
                if report.interrupted {
                    break;
                }
            }
            Err(e) if !once => error!(error = %e, "Pass failed"),
            Err(e) => return Err(e).context("Pipeline pass failed"),
        }

        if once {
            break;
        }

        tokio::select! {
            _ = shutdown.triggered() => {
                info!("Shutting down processor");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(())
}
