use anyhow::{Context, Result};
use azure_health_exporter::azure::{AzureClient, ResourceHealthClient, ResourcesClient};
use azure_health_exporter::collector::exposition::Exposition;
use azure_health_exporter::collector::Collector;
use azure_health_exporter::config::Config;
use azure_health_exporter::server::{build_router, AppState};
use azure_health_exporter::VERSION;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Prometheus exporter for Azure Resource Health
#[derive(Parser, Debug)]
#[command(name = "azure-health-exporter", version = VERSION, about, long_about = None)]
struct Args {
    /// Exporter configuration file
    #[arg(long = "config.file", default_value = "config/config.yml")]
    config_file: PathBuf,

    /// The address to listen on for HTTP requests
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9613")]
    listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    metrics_path: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level();

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(log_file.is_none())
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;
    tracing::info!("Starting azure-health-exporter {}", VERSION);

    let config = Config::load(&args.config_file).context("Error loading config file")?;

    let client = AzureClient::from_environment().context("Error creating Azure session")?;
    tracing::info!("Using subscription {}", client.subscription_id);

    let collector = Collector::new(
        Arc::new(config),
        Arc::new(ResourcesClient::new(client.clone())),
        Arc::new(ResourceHealthClient::new(client)),
    );
    let exposition = Exposition::new(VERSION).context("Failed to set up metrics registry")?;

    let state = Arc::new(AppState {
        collector,
        exposition,
        metrics_path: args.metrics_path,
    });
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_address))?;
    tracing::info!("Beginning to serve on address {}", args.listen_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
