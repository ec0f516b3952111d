//! Server configuration, loadable from TOML.
//!
//! ```toml
//! bind_address = "0.0.0.0:8080"
//! max_body_size = 1048576
//!
//! [[routes]]
//! path = "/greeter"
//! sources = ["demo/base", "demo/sub"]
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::{HttpServerError, Result};

/// Configuration for the HTTP server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Paths to bind at startup
    pub routes: Vec<RouteConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_body_size: 1024 * 1024, // 1MB
            routes: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|source| HttpServerError::Config {
            path: path.display().to_string(),
            source,
        })
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Add a route bound to the given handler sources
    pub fn route<I, S>(mut self, path: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes.push(RouteConfig::new(
            path,
            sources.into_iter().map(Into::into).collect(),
        ));
        self
    }
}

/// One URL path and the ordered handler sources merged to serve it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    pub sources: Vec<String>,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            path: path.into(),
            sources,
        }
    }

    pub fn routing_key(&self) -> &str {
        routing_key(&self.path)
    }
}

/// Routing key for a request path: the path without its leading slash.
pub fn routing_key(path: &str) -> &str {
    path.trim_start_matches('/')
}
