//! HTTP server accept loop

use std::convert::Infallible;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use urlrpc_json_rpc_server::{HandlerProvider, JsonRpcDispatcher};

use crate::config::RouteConfig;
use crate::{Result, RpcHttpHandler, ServerConfig};

/// Bind every configured route to its handler sources.
pub fn initialize_routes(provider: &dyn HandlerProvider, routes: &[RouteConfig]) -> Result<()> {
    for route in routes {
        provider.initialize(route.routing_key(), &route.sources)?;
        info!(path = %route.path, sources = ?route.sources, "Bound route");
    }
    Ok(())
}

/// HTTP JSON-RPC server
#[derive(Debug)]
pub struct RpcHttpServer {
    config: ServerConfig,
    handler: RpcHttpHandler,
}

impl RpcHttpServer {
    pub fn new(config: ServerConfig, dispatcher: JsonRpcDispatcher) -> Self {
        let handler = RpcHttpHandler::new(&config, dispatcher);
        Self { config, handler }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections until the listener fails
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        info!("JSON-RPC server listening on {}", self.config.bind_address);
        for route in &self.config.routes {
            info!("Endpoint available at: /{}", route.routing_key());
        }

        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("Accepted connection from {}", peer);
            let handler = self.handler.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
