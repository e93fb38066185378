//! Configuration schema definitions.
//!
//! One file configures both roles; each binary reads the sections it needs.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::params::store::DEFAULT_PAGE_SIZE;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Edge listener.
    pub listener: ListenerConfig,

    /// Invocation target used by the edge.
    pub function: FunctionConfig,

    /// Function host listener and outbound client.
    pub function_host: FunctionHostConfig,

    /// Parameter store layout and backing file.
    pub parameters: ParametersConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Edge listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Invocation target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FunctionConfig {
    /// Name of the signing function.
    pub name: String,

    /// Root URL of the function host (`http://host:port`).
    pub endpoint: String,

    /// Per-invocation timeout in seconds.
    pub invoke_timeout_secs: u64,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: "signing-function".to_string(),
            endpoint: "http://127.0.0.1:9001".to_string(),
            invoke_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FunctionHostConfig {
    /// Bind address for the invoke API.
    pub bind_address: String,

    /// Timeout for the outbound signed request in seconds.
    pub upstream_timeout_secs: u64,
}

impl Default for FunctionHostConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9001".to_string(),
            upstream_timeout_secs: 30,
        }
    }
}

/// Parameter store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParametersConfig {
    /// Path prefix under which per-host parameters live.
    pub prefix: String,

    /// TOML file with a `[parameters]` table of full names to values.
    pub file: Option<String>,

    /// Reload the parameters file when it changes.
    pub watch: bool,

    /// Page size of store listings.
    pub page_size: usize,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            file: None,
            watch: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// `EnvFilter` directive for this crate and the HTTP middleware.
    pub fn log_directive(&self) -> String {
        format!("signing_proxy={level},tower_http={level}", level = self.log_level)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 6 * 1024 * 1024, // invoke payload ceiling
        }
    }
}
