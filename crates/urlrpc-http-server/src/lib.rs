//! # urlrpc HTTP server
//!
//! HTTP transport for the urlrpc JSON-RPC engine. The request path selects
//! the handler (`POST /calc` dispatches against routing key `calc`), the
//! request body is handed to the engine untouched, and the engine's output
//! becomes the response body.
//!
//! ## Features
//! - TOML configuration of routes and their handler sources
//! - Request body size limit
//! - `GET <path>` lists the methods bound to that path

pub mod config;
pub mod demo;
pub mod handler;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use config::{RouteConfig, ServerConfig};
pub use handler::RpcHttpHandler;
pub use server::{RpcHttpServer, initialize_routes};

// Re-export foundational types
pub use urlrpc_json_rpc_server::{HandlerProvider, JsonRpcDispatcher};

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration in {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Handler setup failed: {0}")]
    Provider(#[from] urlrpc_json_rpc_server::ProviderError),
}
