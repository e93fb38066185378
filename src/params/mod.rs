//! Signing parameters: storage, resolution and application.
//!
//! # Data Flow
//! ```text
//! Host header
//!     → resolver.rs (cache lookup, single-flight miss handling)
//!     → store.rs (paginated listing under /<prefix>/<host>)
//!     → parameter.rs (entries → SigningParameter)
//!     → signer.rs (headers, basic credentials, queries, path rewrite)
//! ```

pub mod parameter;
pub mod resolver;
pub mod signer;
pub mod singleflight;
pub mod store;

pub use parameter::{Category, ParameterEntry, SigningParameter};
pub use resolver::{parameter_path, ParameterResolver, Resolution, ResolveError, SharedSource};
pub use signer::SignError;
pub use singleflight::SingleFlight;
pub use store::{MemoryParameterStore, ParameterPage, ParameterSource, PathQuery, StoreError, StoredParameter};
