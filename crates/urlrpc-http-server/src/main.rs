//! urlrpc server binary
//!
//! Serves the demo handler sources over HTTP. Routes come from the TOML file
//! given with `--config`; without routes the demo calculator and greeter are
//! bound at `/calc` and `/greeter`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use urlrpc_http_server::demo::{default_routes, demo_catalog};
use urlrpc_http_server::{JsonRpcDispatcher, RpcHttpServer, ServerConfig, initialize_routes};
use urlrpc_json_rpc_server::CatalogProvider;

#[derive(Parser)]
#[command(name = "urlrpc-server")]
#[command(about = "JSON-RPC 2.0 over HTTP, one handler per URL path")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding the configuration
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config = config.bind_address(bind);
    }
    if config.routes.is_empty() {
        info!("No routes configured, serving demo routes");
        config.routes = default_routes();
    }

    let provider = CatalogProvider::new(demo_catalog());
    initialize_routes(&provider, &config.routes).context("binding routes")?;
    let dispatcher = JsonRpcDispatcher::new(Arc::new(provider));

    let server = RpcHttpServer::new(config, dispatcher);
    tokio::select! {
        result = server.run() => result.context("server stopped")?,
        _ = tokio::signal::ctrl_c() => warn!("Shutdown signal received"),
    }
    Ok(())
}
