//! The invocation-side role.
//!
//! # Data Flow
//! ```text
//! RequestEnvelope
//!     → handler.rs (decode, resolve parameters for Host)
//!         → NotFound: fixed 407 response
//!     → SigningParameter::sign
//!     → upstream.rs (real outbound HTTPS call)
//!     → ResponseEnvelope
//! ```

pub mod handler;
pub mod upstream;

pub use handler::{not_found_response, HandlerError, SignFunction, NOT_FOUND_BODY};
pub use upstream::{ReqwestUpstream, Upstream, UpstreamError};
