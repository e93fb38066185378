//! Signing reverse-proxy gateway library.

pub mod config;
pub mod envelope;
pub mod function;
pub mod http;
pub mod invoke;
pub mod lifecycle;
pub mod observability;
pub mod params;
pub mod proxy;
pub mod security;

pub use config::schema::GatewayConfig;
pub use function::SignFunction;
pub use http::{FunctionHost, HttpServer};
pub use lifecycle::Shutdown;
pub use params::ParameterResolver;
pub use proxy::ForwardProxy;
