//! Handler provider: routing key to the live handler generation.
//!
//! A routing key is bound to an ordered list of source locations. Each
//! location names a [`HandlerSource`] in the [`SourceCatalog`]; loading the
//! list layers their methods into one [`MethodRegistry`], later sources
//! overriding earlier ones. A reload builds a whole new generation and swaps
//! it in, so calls already holding the previous `Arc<Handler>` finish
//! against the generation they started with.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::registry::MethodRegistry;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no handler bound to routing key '{0}'")]
    Unbound(String),

    #[error("routing key '{0}' was given no handler sources")]
    NoSources(String),

    #[error("unknown handler source '{0}'")]
    UnknownSource(String),

    #[error("failed to load handler source '{location}': {message}")]
    Load { location: String, message: String },
}

/// Something that can populate a registry, standing in for a compiled script.
pub trait HandlerSource: Send + Sync {
    fn load(&self, registry: &mut MethodRegistry) -> anyhow::Result<()>;
}

impl<F> HandlerSource for F
where
    F: Fn(&mut MethodRegistry) -> anyhow::Result<()> + Send + Sync,
{
    fn load(&self, registry: &mut MethodRegistry) -> anyhow::Result<()> {
        self(registry)
    }
}

/// Named handler sources available to a provider
#[derive(Clone, Default)]
pub struct SourceCatalog {
    sources: HashMap<String, Arc<dyn HandlerSource>>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under `location`, replacing any previous one.
    pub fn register<S>(&mut self, location: impl Into<String>, source: S) -> &mut Self
    where
        S: HandlerSource + 'static,
    {
        self.sources.insert(location.into(), Arc::new(source));
        self
    }

    pub fn with_source<S>(mut self, location: impl Into<String>, source: S) -> Self
    where
        S: HandlerSource + 'static,
    {
        self.register(location, source);
        self
    }

    pub fn get(&self, location: &str) -> Option<&Arc<dyn HandlerSource>> {
        self.sources.get(location)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.sources.contains_key(location)
    }

    /// Registered locations in sorted order
    pub fn locations(&self) -> Vec<&str> {
        let mut locations: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        locations.sort_unstable();
        locations
    }
}

impl fmt::Debug for SourceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCatalog")
            .field("locations", &self.locations())
            .finish()
    }
}

/// One loaded handler generation
#[derive(Debug)]
pub struct Handler {
    routing_key: String,
    generation: u64,
    sources: Vec<String>,
    loaded_at: DateTime<Utc>,
    registry: MethodRegistry,
}

impl Handler {
    pub fn new(
        routing_key: impl Into<String>,
        generation: u64,
        sources: Vec<String>,
        registry: MethodRegistry,
    ) -> Self {
        Self {
            routing_key: routing_key.into(),
            generation,
            sources,
            loaded_at: Utc::now(),
            registry,
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }
}

/// Supplies the current handler generation for a routing key
pub trait HandlerProvider: Send + Sync {
    /// The live generation bound to `routing_key`, if any
    fn resolve(&self, routing_key: &str) -> Option<Arc<Handler>>;

    /// Rebuild the handler for `routing_key` from its recorded sources and
    /// bind the new generation.
    fn reload(&self, routing_key: &str) -> Result<Arc<Handler>, ProviderError>;

    /// Bind `routing_key` to an ordered list of source locations.
    fn initialize(
        &self,
        routing_key: &str,
        sources: &[String],
    ) -> Result<Arc<Handler>, ProviderError>;
}

/// In-memory provider that loads handler generations from a [`SourceCatalog`]
#[derive(Debug)]
pub struct CatalogProvider {
    catalog: SourceCatalog,
    bindings: RwLock<HashMap<String, Arc<Handler>>>,
    generations: AtomicU64,
}

impl CatalogProvider {
    pub fn new(catalog: SourceCatalog) -> Self {
        Self {
            catalog,
            bindings: RwLock::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &SourceCatalog {
        &self.catalog
    }

    /// Bound routing keys in sorted order
    pub fn routing_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    fn build(&self, routing_key: &str, sources: &[String]) -> Result<Handler, ProviderError> {
        if sources.is_empty() {
            return Err(ProviderError::NoSources(routing_key.to_string()));
        }

        let mut registry = MethodRegistry::new();
        for location in sources {
            let source = self
                .catalog
                .get(location)
                .ok_or_else(|| ProviderError::UnknownSource(location.clone()))?;

            let mut layer = MethodRegistry::new();
            source.load(&mut layer).map_err(|err| ProviderError::Load {
                location: location.clone(),
                message: format!("{err:#}"),
            })?;
            debug!(
                routing_key,
                location = location.as_str(),
                methods = layer.len(),
                "Loaded handler source"
            );
            registry.merge(layer);
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Handler::new(routing_key, generation, sources.to_vec(), registry))
    }

    /// Bind `handler` unless the key moved on while it was being built.
    ///
    /// A reload passes the generation it started from and only replaces that
    /// exact generation; an initialize only replaces older generations.
    /// `Err` carries the binding that superseded the build.
    fn bind(
        &self,
        handler: Handler,
        based_on: Option<u64>,
    ) -> Result<Arc<Handler>, Arc<Handler>> {
        let mut bindings = self.bindings.write();
        if let Some(current) = bindings.get(handler.routing_key()) {
            let stale = match based_on {
                Some(base) => current.generation() != base,
                None => current.generation() > handler.generation(),
            };
            if stale {
                return Err(Arc::clone(current));
            }
        }

        let handler = Arc::new(handler);
        bindings.insert(handler.routing_key().to_string(), Arc::clone(&handler));
        Ok(handler)
    }
}

impl HandlerProvider for CatalogProvider {
    fn resolve(&self, routing_key: &str) -> Option<Arc<Handler>> {
        self.bindings.read().get(routing_key).cloned()
    }

    fn reload(&self, routing_key: &str) -> Result<Arc<Handler>, ProviderError> {
        let (base, sources) = self
            .resolve(routing_key)
            .map(|handler| (handler.generation(), handler.sources().to_vec()))
            .ok_or_else(|| ProviderError::Unbound(routing_key.to_string()))?;

        let handler = self.build(routing_key, &sources).inspect_err(|err| {
            warn!(routing_key, error = %err, "Reload failed, keeping previous handler");
        })?;

        match self.bind(handler, Some(base)) {
            Ok(handler) => {
                info!(
                    routing_key,
                    generation = handler.generation(),
                    methods = handler.registry().len(),
                    "Reloaded handler"
                );
                Ok(handler)
            }
            Err(current) => {
                debug!(
                    routing_key,
                    base,
                    current = current.generation(),
                    "Dropping reload superseded by a newer binding"
                );
                Ok(current)
            }
        }
    }

    fn initialize(
        &self,
        routing_key: &str,
        sources: &[String],
    ) -> Result<Arc<Handler>, ProviderError> {
        let handler = match self.bind(self.build(routing_key, sources)?, None) {
            Ok(handler) => handler,
            Err(current) => {
                debug!(
                    routing_key,
                    current = current.generation(),
                    "Dropping initialize superseded by a newer binding"
                );
                return Ok(current);
            }
        };
        info!(
            routing_key,
            sources = ?handler.sources(),
            generation = handler.generation(),
            "Initialized handler"
        );
        Ok(handler)
    }
}
