use anyhow::{Context, Result};
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dv_router::config::{self, RouterConfig, DEFAULT_PUSH_TIMEOUT, DEFAULT_UPDATE_INTERVAL};
use dv_router::network::{address, HttpTransport};
use dv_router::Router;

#[derive(Parser)]
#[command(name = "dv-router", about = "Distance-vector routing node")]
struct Cli {
    /// Address this router listens on and announces as its own.
    #[arg(long, required_unless_present = "config")]
    ip: Option<Ipv4Addr>,

    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// CSV file of direct neighbors: header row, then `address,cost`.
    #[arg(short = 'f', long, required_unless_present = "config")]
    file: Option<PathBuf>,

    /// Network administered by this router (e.g. 10.0.1.0/24).
    #[arg(long, required_unless_present = "config")]
    network: Option<String>,

    /// Seconds between periodic updates.
    #[arg(long, default_value_t = DEFAULT_UPDATE_INTERVAL)]
    interval: u64,

    /// Seconds to wait for a neighbor to accept an update.
    #[arg(long, default_value_t = DEFAULT_PUSH_TIMEOUT)]
    push_timeout: u64,

    /// JSON router configuration, used instead of the flags above.
    #[arg(short, long, conflicts_with_all = ["ip", "file", "network"])]
    config: Option<PathBuf>,
}

fn build_config(cli: &Cli) -> Result<RouterConfig> {
    if let Some(path) = &cli.config {
        return RouterConfig::load(path)
            .with_context(|| format!("cannot load configuration {}", path.display()));
    }

    let (Some(ip), Some(file), Some(network)) = (cli.ip, &cli.file, &cli.network) else {
        anyhow::bail!("--ip, --file and --network are required without --config");
    };
    let network = address::parse_prefix(network)
        .with_context(|| format!("--network {} is not a CIDR prefix", network))?;
    let neighbors = config::load_neighbors_csv(file)?;

    Ok(RouterConfig::new(SocketAddrV4::new(ip, cli.port), network, neighbors)
        .with_update_interval(cli.interval)
        .with_push_timeout(cli.push_timeout))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    config.validate()?;

    info!("--- Starting router ---");
    info!("Address: {}", config.address);
    info!("Local network: {}", config.network);
    info!("Direct neighbors: {:?}", config.neighbors);
    info!("Update interval: {}s", config.update_interval);

    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let transport = Arc::new(HttpTransport::new(config.push_timeout())?);
        let listener = TcpListener::bind(config.address)
            .await
            .with_context(|| format!("cannot listen on {}", config.address))?;

        let router = Arc::new(Router::new(config));
        router.start(listener, transport, shutdown_signal()).await
    })
}
