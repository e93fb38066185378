//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Edge proxy, function host and resolver produce:
//!     → logging.rs (structured log events, request ID in span fields)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the trace span of every request
//! - Metric updates are cheap when no recorder is installed (no-ops)
//! - Parameter values never appear in log fields

pub mod logging;
pub mod metrics;
