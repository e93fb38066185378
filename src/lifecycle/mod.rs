//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build store, resolver, clients → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Clients for remote services are built lazily (lazy.rs), once
//! - Listeners start last (traffic only when ready)

pub mod lazy;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use lazy::{ClientInitError, LazyClient};
pub use shutdown::Shutdown;
pub use signals::{forward_signals, shutdown_signal};
