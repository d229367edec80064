use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use http_log_shipper::config::validation::validate_config;
use http_log_shipper::config::{load_config, ConfigError, ShipperConfig};
use http_log_shipper::lifecycle::{wait_for_signal, Shutdown};
use http_log_shipper::observability::{logging, metrics};
use http_log_shipper::{AsyncDispatcher, HttpServer, TransportClient};

#[derive(Parser)]
#[command(name = "http-log-shipper")]
#[command(about = "Demo HTTP server that ships request logs to a TCP collector", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override collector.host
    #[arg(long)]
    collector_host: Option<String>,

    /// Override collector.port
    #[arg(long)]
    collector_port: Option<u16>,

    /// Do not connect to the collector or queue records
    #[arg(long)]
    disable_collector: bool,
}

impl Cli {
    fn apply(&self, config: &mut ShipperConfig) {
        if let Some(host) = &self.collector_host {
            config.collector.host = host.clone();
        }
        if let Some(port) = self.collector_port {
            config.collector.port = port;
        }
        if self.disable_collector {
            config.collector.enabled = false;
        }
    }
}

/// File (or defaults) plus command-line overrides, validated as a whole.
fn resolve_config(cli: &Cli) -> Result<ShipperConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ShipperConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;

    logging::init(&config.observability)?;

    tracing::info!("http-log-shipper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        collector_host = %config.collector.host,
        collector_port = config.collector.port,
        collector_enabled = config.collector.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    let transport = TransportClient::new(&config.collector);
    transport.start();
    let dispatcher = AsyncDispatcher::start(
        Arc::clone(&transport),
        config.collector.queue_capacity,
        shutdown.subscribe(),
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config.capture, Arc::new(dispatcher));
    tokio::spawn(wait_for_signal(shutdown.clone()));
    server.run(listener, shutdown.subscribe()).await?;

    transport.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
