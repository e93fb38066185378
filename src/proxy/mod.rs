//! Forward proxy orchestration at the edge.
//!
//! # Data Flow
//! ```text
//! inbound Request<Body>
//!     → strip hop-by-hop, append X-Forwarded-For, Host from absolute target
//!     → RequestEnvelope (JSON) → InvocationTarget
//!     → classify → ResponseEnvelope → Response (hop-by-hop stripped)
//!
//! On failure:
//!     ProxyError → 400 (request body) or 502 (everything else)
//! ```
//!
//! # Design Decisions
//! - No retries: transport and function failures surface as 502
//! - The invocation target client is built on first request

pub mod error;
pub mod forward;

pub use error::ProxyError;
pub use forward::{ForwardProxy, SharedTarget};
