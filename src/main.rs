//! Agri Advisor - agronomic advisory service
//!
//! # Usage
//!
//! ```bash
//! # HTTP service (POST /api/v1/advisories)
//! agri-advisor serve --addr 0.0.0.0:8080
//!
//! # One advisory from a JSON request file, printed to stdout
//! agri-advisor advise --input request.json
//!
//! # Load, validate and print the effective configuration
//! agri-advisor check-config
//! ```
//!
//! # Environment Variables
//!
//! - `AGRI_ADVISOR_CONFIG`: Path to the TOML config (default: ./advisor_config.toml)
//! - `GROQ_API_KEY`: Generative backend key (advisories use templates without it)
//! - `WEATHER_API_KEY`: OpenWeatherMap key (weather context disabled without it)
//! - `MARKET_API_KEY`: Bearer token for the price service, when it needs one
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use agri_advisor::api::{create_app, AdviseRequest, ApiState};
use agri_advisor::config::AdvisorConfig;
use agri_advisor::pipeline::{Aggregator, Maintenance};
use agri_advisor::storage;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "agri-advisor")]
#[command(about = "Agronomic advisory aggregation engine")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides AGRI_ADVISOR_CONFIG and ./advisor_config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the HTTP service (default)
    Serve {
        /// Override the server address from config
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Produce one advisory from a JSON request file
    Advise {
        /// Request file: {"domain", "entity_key", "result", "context"}
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Load and validate the configuration, then print it as TOML
    CheckConfig,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AdvisorConfig> {
    match path {
        Some(path) => AdvisorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AdvisorConfig::load()),
    }
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_server(config: AdvisorConfig, addr: Option<String>) -> Result<()> {
    let server_addr = addr.unwrap_or_else(|| config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Agri Advisor - Agronomic Advisory Engine");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        generative = config.generative.enabled,
        model = %config.generative.model,
        timeout_ms = config.generative.timeout_ms,
        cache_entries = config.cache.max_entries,
        deadline_ms = config.request.deadline_ms,
        "Configuration loaded"
    );

    let history = storage::open_configured(&config.storage);
    let mut aggregator = Aggregator::from_config(&config);
    if let Some(h) = &history {
        info!(path = %config.storage.path, records = h.count(), "Advisory history enabled");
        aggregator = aggregator.with_sink(Arc::new(h.clone()));
    }

    let maintenance = Maintenance::new(
        aggregator.cache().clone(),
        history.clone(),
        config.storage.retention_days,
    )
    .spawn(Duration::from_secs(config.cache.sweep_interval_secs));

    let app = create_app(ApiState::new(Arc::new(aggregator), history.clone()));

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("HTTP server listening on {}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("HTTP server error")?;

    maintenance.abort();
    if let Some(h) = history {
        if let Err(e) = h.flush() {
            warn!(error = %e, "Failed to flush advisory history");
        }
    }
    info!("Agri Advisor shutdown complete");
    Ok(())
}

async fn run_advise(config: AdvisorConfig, input: PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let request: AdviseRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid advisory request in {}", input.display()))?;

    let aggregator = Aggregator::from_config(&config);
    let advisory = aggregator
        .advise_with_hints(request.domain, request.result, &request.entity_key, request.context)
        .await
        .context("Advisory request failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&advisory).context("Failed to serialize advisory")?
    );
    Ok(())
}

fn run_check_config(config: &AdvisorConfig) -> Result<()> {
    config.validate().context("Configuration is invalid")?;
    print!("{}", config.to_toml().context("Failed to render configuration")?);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // API keys may live in .env
    let dotenv = dotenvy::dotenv();
    init_logging(args.log_json);
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let config = load_config(args.config.as_ref())?;

    match args.command.unwrap_or(SubCommand::Serve { addr: None }) {
        SubCommand::Serve { addr } => run_server(config, addr).await,
        SubCommand::Advise { input } => run_advise(config, input).await,
        SubCommand::CheckConfig => run_check_config(&config),
    }
}
