//! Signing reverse proxy: edge role.
//!
//! # Architecture Overview
//!
//! ```text
//!  Client ──▶ signing-proxy ──────── invoke (envelope) ────────▶ signing-function
//!             │ http server                                     │ function host
//!             │ hop-by-hop strip, X-Forwarded-For               │ resolver (cache, single flight)
//!             │ RequestEnvelope                                 │ sign → outbound HTTPS ──▶ Backend
//!  Client ◀── │ ResponseEnvelope ◀───────────────────────────── │ ResponseEnvelope
//! ```

use std::path::PathBuf;

use clap::Parser;

use signing_proxy::lifecycle::startup::{self, Overrides, Role};
use signing_proxy::lifecycle::{forward_signals, Shutdown};
use signing_proxy::observability::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "signing-proxy", version, about = "Forward proxy that signs requests through a signing function")]
struct Args {
    /// Gateway configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the signing function to invoke.
    #[arg(long)]
    function_name: Option<String>,

    /// Root URL of the function host.
    #[arg(long)]
    function_endpoint: Option<String>,

    /// Address for listening, e.g. 127.0.0.1:8000.
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides = Overrides {
        address: args.address,
        function_name: args.function_name,
        function_endpoint: args.function_endpoint,
        ..Default::default()
    };
    let config = startup::load(args.config.as_deref(), overrides, Role::Edge)?;

    init_logging(Some(&config.observability.log_directive()));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        function = %config.function.name,
        endpoint = %config.function.endpoint,
        "signing-proxy starting"
    );

    let shutdown = Shutdown::new();
    forward_signals(shutdown.clone());
    startup::run_edge(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
