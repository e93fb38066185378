//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Edge:
//!     TCP connection
//!     → server.rs (Axum setup, middleware, connect info)
//!     → request.rs (request ID, trace span)
//!     → proxy::ForwardProxy
//!
//! Function host:
//!     POST /2015-03-31/functions/{name}/invocations
//!     → function.rs (decode envelope, run SignFunction, map errors)
//! ```

pub mod function;
pub mod request;
pub mod server;

pub use function::FunctionHost;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
