//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → CLI flags override selected fields
//!
//! parameters.toml ([parameters] table)
//!     → loader.rs (load_parameters)
//!     → MemoryParameterStore
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs reloads the parameters file
//!     → atomic swap of the store snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the parameters file reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_parameters, ConfigError};
pub use schema::{
    FunctionConfig, FunctionHostConfig, GatewayConfig, ListenerConfig, ObservabilityConfig,
    ParametersConfig, SecurityConfig, TimeoutConfig,
};
pub use validation::ValidationError;
pub use watcher::ParametersWatcher;
