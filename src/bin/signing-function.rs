//! Signing function host: resolves per-host parameters, signs, and forwards.

use std::path::PathBuf;

use clap::Parser;

use signing_proxy::lifecycle::startup::{self, Overrides, Role};
use signing_proxy::lifecycle::{forward_signals, Shutdown};
use signing_proxy::observability::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "signing-function", version, about = "Signing function served over the invoke API")]
struct Args {
    /// Gateway configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parameter path prefix.
    #[arg(long, env = "SIGNING_PROXY_PREFIX")]
    prefix: Option<String>,

    /// Name this host answers to.
    #[arg(long)]
    function_name: Option<String>,

    /// Address for listening, e.g. 127.0.0.1:9001.
    #[arg(long)]
    address: Option<String>,

    /// Parameters file (TOML with a [parameters] table).
    #[arg(long)]
    parameters: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides = Overrides {
        address: args.address,
        function_name: args.function_name,
        prefix: args.prefix,
        parameters_file: args.parameters,
        ..Default::default()
    };
    let config = startup::load(args.config.as_deref(), overrides, Role::FunctionHost)?;

    init_logging(Some(&config.observability.log_directive()));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.function_host.bind_address,
        function = %config.function.name,
        prefix = %config.parameters.prefix,
        "signing-function starting"
    );

    let shutdown = Shutdown::new();
    forward_signals(shutdown.clone());
    startup::run_function_host(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
