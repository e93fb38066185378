//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → RequestBodyLimitLayer (reject oversized bodies with 413)
//!     → headers.rs (strip hop-by-hop, append X-Forwarded-For)
//!     → Pass to the invocation target
//!
//! Returned response:
//!     → headers.rs (strip hop-by-hop)
//! ```
//!
//! # Design Decisions
//! - Headers named by `Connection` are dropped before the fixed hop-by-hop set
//! - Existing X-Forwarded-For values are kept; the caller IP is appended

pub mod headers;

pub use headers::{append_forwarded_for, strip_hop_headers, HOP_HEADERS};
