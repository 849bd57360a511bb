//! gtbridge - a local man-in-the-middle relay for the Growtopia
//! client/server link.
//!
//! The HTTPS bootstrap hands the client a `server_data.php` response that
//! points at this process; from then on both the login and every world
//! switch ride through the ENet bridge.

mod bridge;
mod config;
mod handlers;
mod scheduler;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::bridge::Bridge;
use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "gtbridge", version, about = "Man-in-the-middle proxy for the Growtopia protocol")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override the ENet listen port.
    #[arg(long)]
    port: Option<u16>,
    /// Override the HTTPS listen port.
    #[arg(long)]
    web_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting gtbridge v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.host.port = port;
    }
    if let Some(port) = cli.web_port {
        config.web.port = port;
    }

    let (redirect_tx, redirect_rx) = mpsc::unbounded_channel();
    let mut bridge = Bridge::new(&config, redirect_rx)?;

    let web_config = gtbridge_web::WebConfig {
        listen_port: config.web.port,
        server_address: config.server.address.clone(),
        proxy_port: bridge.enet_port(),
        dns_provider: gtbridge_web::DnsProvider::from_name(&config.dns.provider),
        resource_dir: config.web.resource_dir.clone(),
    };
    tokio::spawn(async move {
        if let Err(err) = gtbridge_web::serve(web_config, redirect_tx).await {
            error!("Web server failed: {err:#}");
        }
    });

    tokio::select! {
        result = bridge.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }
    bridge.shutdown();
    Ok(())
}
