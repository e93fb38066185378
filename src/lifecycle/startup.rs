//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply command-line overrides
//! - Build the parameter store (and its file watcher) and the clients
//! - Start metrics, then the listener of the requested role
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::validate_config;
use crate::config::watcher::apply_updates;
use crate::config::{load_config, load_parameters, ConfigError, GatewayConfig, ParametersConfig, ParametersWatcher};
use crate::function::{ReqwestUpstream, SignFunction};
use crate::http::{FunctionHost, HttpServer};
use crate::invoke::HttpInvoker;
use crate::lifecycle::{LazyClient, Shutdown};
use crate::observability::metrics;
use crate::params::{MemoryParameterStore, ParameterResolver, SharedSource};
use crate::proxy::{ForwardProxy, SharedTarget};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("parameters watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("client setup: {0}")]
    Client(String),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// Which role a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Edge,
    FunctionHost,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub function_name: Option<String>,
    pub function_endpoint: Option<String>,
    pub prefix: Option<String>,
    pub parameters_file: Option<PathBuf>,
}

/// Load the config file (or defaults), apply `overrides` and validate.
pub fn load(path: Option<&Path>, overrides: Overrides, role: Role) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(address) = overrides.address {
        match role {
            Role::Edge => config.listener.bind_address = address,
            Role::FunctionHost => config.function_host.bind_address = address,
        }
    }
    if let Some(name) = overrides.function_name {
        config.function.name = name;
    }
    if let Some(endpoint) = overrides.function_endpoint {
        config.function.endpoint = endpoint;
    }
    if let Some(prefix) = overrides.prefix {
        config.parameters.prefix = prefix;
    }
    if let Some(file) = overrides.parameters_file {
        config.parameters.file = Some(file.to_string_lossy().into_owned());
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parameter store plus the watcher keeping it fresh.
pub struct ParameterBackend {
    pub store: Arc<MemoryParameterStore>,
    watcher: Option<RecommendedWatcher>,
}

impl ParameterBackend {
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

/// Build the store from the parameters file and start watching it.
///
/// Must be called from within a Tokio runtime when watching is enabled.
pub fn parameter_backend(config: &ParametersConfig) -> Result<ParameterBackend, StartupError> {
    let store = Arc::new(MemoryParameterStore::new(config.page_size));

    let Some(file) = config.file.as_deref() else {
        tracing::warn!("No parameters file configured; every host will resolve to not found");
        return Ok(ParameterBackend { store, watcher: None });
    };

    let path = Path::new(file);
    store.replace(load_parameters(path)?);

    let watcher = if config.watch {
        let (watcher, updates) = ParametersWatcher::new(path);
        let watcher = watcher.run()?;
        apply_updates(updates, Arc::clone(&store));
        Some(watcher)
    } else {
        None
    };

    Ok(ParameterBackend { store, watcher })
}

/// Edge proxy whose HTTP invoker is built on first request.
pub fn forward_proxy(config: &GatewayConfig) -> ForwardProxy {
    let endpoint = config.function.endpoint.clone();
    let target = LazyClient::new("invocation target", move || {
        HttpInvoker::new(&endpoint).map(|invoker| Arc::new(invoker) as SharedTarget)
    });

    ForwardProxy::new(
        config.function.name.clone(),
        target,
        Duration::from_secs(config.function.invoke_timeout_secs),
        config.security.max_body_size,
    )
}

pub fn sign_function(config: &GatewayConfig, source: SharedSource) -> Result<SignFunction, StartupError> {
    let upstream = ReqwestUpstream::new(Duration::from_secs(config.function_host.upstream_timeout_secs))
        .map_err(StartupError::Client)?;
    // Connected on first resolution.
    let store = LazyClient::new("parameter store", move || Ok(Arc::clone(&source)));
    let resolver = ParameterResolver::new(config.parameters.prefix.clone(), store);
    Ok(SignFunction::new(resolver, Arc::new(upstream)))
}

fn start_metrics(config: &GatewayConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(_) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            "Failed to parse metrics address"
        ),
    }
}

/// Run the edge role on the configured address until `shutdown` fires.
pub async fn run_edge(config: GatewayConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    start_metrics(&config);
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    serve_edge(config, listener, shutdown).await
}

pub async fn serve_edge(config: GatewayConfig, listener: TcpListener, shutdown: Shutdown) -> Result<(), StartupError> {
    let proxy = forward_proxy(&config);
    HttpServer::new(config, proxy).run(listener, shutdown.wait()).await?;
    Ok(())
}

/// Run the function host on the configured address until `shutdown` fires.
pub async fn run_function_host(config: GatewayConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    start_metrics(&config);
    let listener = TcpListener::bind(&config.function_host.bind_address).await?;
    serve_function_host(config, listener, shutdown).await
}

pub async fn serve_function_host(
    config: GatewayConfig,
    listener: TcpListener,
    shutdown: Shutdown,
) -> Result<(), StartupError> {
    let backend = parameter_backend(&config.parameters)?;
    tracing::info!(
        prefix = %config.parameters.prefix,
        entries = backend.store.len(),
        watching = backend.is_watching(),
        "Parameter store ready"
    );

    let source: SharedSource = backend.store.clone();
    let function = sign_function(&config, source)?;
    FunctionHost::new(&config, function).run(listener, shutdown.wait()).await?;

    drop(backend);
    Ok(())
}
