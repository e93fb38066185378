//! Structured logging.
//!
//! `RUST_LOG` takes precedence over the configured default directive.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directive when neither config nor environment provide one.
pub const DEFAULT_DIRECTIVE: &str = "signing_proxy=info,tower_http=info";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(default_directive: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive.unwrap_or(DEFAULT_DIRECTIVE)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
