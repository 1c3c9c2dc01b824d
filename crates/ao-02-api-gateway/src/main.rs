//! `ao-gateway`: attested submission intake server.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use ao_02_api_gateway::{ApiGatewayService, GatewayConfig, VERSION};

/// Attested file submission gateway
#[derive(Parser, Debug)]
#[command(name = "ao-gateway")]
#[command(about = "Accepts signed project data submissions and serves stored files")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port (overrides file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides file and environment)
    #[arg(long)]
    host: Option<IpAddr>,
}

/// Defaults, then the TOML file, then `AO_*` variables, then flags.
fn load_config(args: &Args) -> Result<GatewayConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            GatewayConfig::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => GatewayConfig::default(),
    };

    config
        .apply_env()
        .context("applying environment overrides")?;

    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(host) = args.host {
        config.http.host = host;
    }

    Ok(config)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => {
            error!(error = %e, "cannot listen for Ctrl+C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    ao_telemetry::init_telemetry(&config.telemetry).context("initializing logging")?;
    info!(version = VERSION, "Starting attestation oracle gateway");

    let service = ApiGatewayService::from_config(config).context("building gateway")?;
    service.serve(shutdown_signal()).await?;

    Ok(())
}
