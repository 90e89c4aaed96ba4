//! CLI entry point: `serve` runs the HTTP adapter, `detect` runs one
//! drift-detection pass against a baseline and exits (§2's control flow).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fw_alert::AlertEmitter;
use fw_drift::{DriftEngine, ThresholdConfig};
use fw_model::BaselineId;
use fw_server::{routes, state::AppState};
use fw_store::Store;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fw-server", about = "Agent-behavior observability platform")]
struct Cli {
    /// Path to the embedded database file, or `:memory:`.
    #[arg(long, env = "DATABASE_URL", default_value = ":memory:", global = true)]
    database_url: String,

    /// YAML threshold config overriding the compiled-in §4.F defaults.
    #[arg(long, env = "THRESHOLD_CONFIG_PATH", global = true)]
    threshold_config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the ingest/query HTTP surface.
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind_addr: String,
    },
    /// Run one drift-detection pass against a baseline and exit.
    Detect {
        #[arg(long)]
        baseline_id: BaselineId,
        #[arg(long)]
        window_start: DateTime<Utc>,
        #[arg(long)]
        window_end: DateTime<Utc>,
        #[arg(long, default_value_t = 1)]
        min_sample_size: u64,
    },
}

fn open_store(database_url: &str) -> Result<Store> {
    if database_url == ":memory:" {
        Ok(Store::open_in_memory()?)
    } else {
        Ok(Store::open(database_url)?)
    }
}

fn load_thresholds(path: Option<&PathBuf>) -> Result<ThresholdConfig> {
    match path {
        Some(path) => Ok(ThresholdConfig::load(path)
            .with_context(|| format!("loading threshold config from {}", path.display()))?),
        None => Ok(ThresholdConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind_addr } => serve(&cli.database_url, cli.threshold_config_path.as_ref(), &bind_addr).await,
        Command::Detect {
            baseline_id,
            window_start,
            window_end,
            min_sample_size,
        } => {
            detect(
                &cli.database_url,
                cli.threshold_config_path.as_ref(),
                baseline_id,
                window_start,
                window_end,
                min_sample_size,
            )
            .await
        }
    }
}

async fn serve(database_url: &str, threshold_path: Option<&PathBuf>, bind_addr: &str) -> Result<()> {
    let store = Arc::new(open_store(database_url)?);
    let thresholds = load_thresholds(threshold_path)?;
    let alerts = Arc::new(AlertEmitter::from_env());

    let state = AppState {
        store,
        thresholds,
        alerts,
    };

    let app = routes::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = bind_addr.parse().context("parsing bind address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "fw-server listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

async fn detect(
    database_url: &str,
    threshold_path: Option<&PathBuf>,
    baseline_id: BaselineId,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_sample_size: u64,
) -> Result<()> {
    let store = open_store(database_url)?;
    let thresholds = load_thresholds(threshold_path)?;
    let alerts = AlertEmitter::from_env();

    let baseline = store
        .get_baseline(baseline_id)?
        .with_context(|| format!("baseline {baseline_id} not found"))?;

    let engine = DriftEngine::new(&store, thresholds);
    let events = engine.detect(&baseline, window_start, window_end, min_sample_size)?;

    for event in &events {
        alerts.emit(event).await;
    }

    tracing::info!(
        baseline_id = %baseline_id,
        events = events.len(),
        "detect pass complete"
    );
    println!("detected {} drift event(s)", events.len());
    for event in &events {
        println!(
            "  {:?} {} {:+.1}% (severity={})",
            event.drift_type, event.metric, event.delta_percent, event.severity
        );
    }
    Ok(())
}
