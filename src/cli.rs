//! Command-line interface components.

use crate::config::Config;
use crate::loader::{DatasetLoader, LoadOutcome};
use crate::replay::ReplayController;
use crate::server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "sensor-replay")]
#[command(about = "Normalize heterogeneous sensor exports and replay them over HTTP")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the data directory and serve the replay API (default)
    Serve(ServeArgs),

    /// Load the data directory once and print what was found
    Inspect(InspectArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(ServeArgs::default())
    }
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Data directory to load; repeat to give fallbacks in priority order
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dirs: Vec<PathBuf>,

    /// Default replay interval in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Keep readings in file order instead of sorting by timestamp
    #[arg(long)]
    pub no_sort: bool,

    /// Allowed CORS origin (overrides CORS_ORIGIN)
    #[arg(long)]
    pub cors_origin: Option<String>,
}

impl ServeArgs {
    /// Apply flags on top of an environment-derived configuration
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(host) = &self.host {
            config = config.with_host(host.clone());
        }
        if !self.data_dirs.is_empty() {
            config = config.with_data_dirs(self.data_dirs.clone());
        }
        if let Some(interval_ms) = self.interval_ms {
            config = config.with_interval_ms(interval_ms);
        }
        if self.no_sort {
            config = config.without_timestamp_sort();
        }
        if let Some(origin) = &self.cors_origin {
            config = config.with_cors_origin(origin.clone());
        }
        config
    }
}

#[derive(clap::Args, Debug)]
pub struct InspectArgs {
    /// Data directory to load; repeat to give fallbacks in priority order
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dirs: Vec<PathBuf>,

    /// Number of readings to print
    #[arg(short = 'n', long, default_value_t = 5)]
    pub limit: usize,

    /// Keep readings in file order instead of sorting by timestamp
    #[arg(long)]
    pub no_sort: bool,
}

impl InspectArgs {
    pub fn apply(&self, mut config: Config) -> Config {
        if !self.data_dirs.is_empty() {
            config = config.with_data_dirs(self.data_dirs.clone());
        }
        if self.no_sort {
            config = config.without_timestamp_sort();
        }
        config
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("sensor_replay={log_level},tower_http={log_level}"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

pub async fn run(args: Args) -> Result<()> {
    match args.command.unwrap_or_default() {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Inspect(inspect_args) => inspect(inspect_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.apply(Config::from_env());
    config.validate()?;

    let loader = DatasetLoader::from_config(&config.ingest);
    let outcome = loader.load_async().await?;
    info!(
        "Loaded {} readings from {} files",
        outcome.cache.len(),
        outcome.stats.files_loaded
    );

    let controller = Arc::new(ReplayController::new(outcome.cache, config.replay.clone()).with_loader(loader));
    let app = server::router(controller, &config.server);

    let address = config.server.bind_address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    server::serve(listener, app, server::shutdown_signal()).await?;
    Ok(())
}

async fn inspect(args: InspectArgs) -> Result<()> {
    let config = args.apply(Config::from_env());
    config.validate()?;

    let outcome = DatasetLoader::from_config(&config.ingest)
        .load_async()
        .await?;

    print_report(&outcome, args.limit)
}

fn print_report(outcome: &LoadOutcome, limit: usize) -> Result<()> {
    let stats = &outcome.stats;

    println!("\n{}", "Load Summary".bright_green().bold());
    match &stats.data_dir {
        Some(dir) => println!(
            "  {} {}",
            "Data directory:".bright_cyan(),
            dir.display().to_string().bright_white()
        ),
        None => println!("  {} {}", "Data directory:".bright_cyan(), "none".bright_yellow()),
    }
    if let Some(warning) = &stats.warning {
        println!("  {} {}", "Warning:".bright_yellow(), warning);
    }
    println!(
        "  {} {}",
        "Files loaded:".bright_cyan(),
        format!("{}/{}", stats.files_loaded, stats.files_discovered).bright_white()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
        for failure in &stats.failures {
            println!("    {} {}", failure.path.display(), failure.reason.dimmed());
        }
    }
    println!(
        "  {} {} ({} air, {} water)",
        "Cache size:".bright_cyan(),
        outcome.cache.len().to_string().bright_white().bold(),
        stats.air_rows,
        stats.water_rows
    );
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.load_time_ms.to_string().bright_white()
    );

    let shown = limit.min(outcome.cache.len());
    if shown > 0 {
        println!("\n{}", format!("First {shown} readings").bright_green().bold());
        for reading in outcome.cache.iter().take(shown) {
            println!("{}", serde_json::to_string_pretty(reading)?);
        }
    }

    Ok(())
}
