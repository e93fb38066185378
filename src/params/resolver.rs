//! Per-host parameter resolution with read-through caching.
//!
//! # Responsibilities
//! - Normalise the host into a resolution key
//! - Serve cached parameters without touching the store
//! - Coalesce concurrent misses for the same key into one store listing
//! - Assemble store entries into a [`SigningParameter`]
//!
//! # Design Decisions
//! - The cache is unbounded and never invalidated; only found parameters are cached
//! - "Not found" is an outcome, not an error, and is never cached
//! - Store failures reach every waiter of the episode and are never cached

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::lifecycle::LazyClient;
use crate::observability::metrics;
use crate::params::parameter::{ParameterEntry, SigningParameter};
use crate::params::singleflight::SingleFlight;
use crate::params::store::{ParameterSource, PathQuery, StoreError};

/// Shared handle to a parameter source.
pub type SharedSource = Arc<dyn ParameterSource>;

/// Outcome of a resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Arc<SigningParameter>),
    /// The store holds no entries under the host's path.
    NotFound,
}

impl Resolution {
    pub fn parameter(&self) -> Option<&Arc<SigningParameter>> {
        match self {
            Self::Found(parameter) => Some(parameter),
            Self::NotFound => None,
        }
    }
}

/// Errors that can occur while resolving parameters.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("parameter resolution for {host} was abandoned")]
    Abandoned { host: String },
}

/// Result type for resolutions.
pub type ResolveResult = Result<Resolution, ResolveError>;

/// Resolves signing parameters per host. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ParameterResolver {
    inner: Arc<Inner>,
}

struct Inner {
    prefix: String,
    source: LazyClient<SharedSource>,
    cache: DashMap<String, Arc<SigningParameter>>,
    flights: SingleFlight<String, ResolveResult>,
}

impl ParameterResolver {
    pub fn new(prefix: impl Into<String>, source: LazyClient<SharedSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                prefix: prefix.into(),
                source,
                cache: DashMap::new(),
                flights: SingleFlight::new(),
            }),
        }
    }

    /// Resolver over an already constructed source.
    pub fn with_source(prefix: impl Into<String>, source: SharedSource) -> Self {
        Self::new(prefix, LazyClient::ready("parameter store", source))
    }

    /// Resolve the signing parameters for `host` (case-insensitive).
    pub async fn resolve(&self, host: &str) -> ResolveResult {
        let key = host.to_lowercase();

        if let Some(parameter) = self.cached(&key) {
            metrics::record_cache_lookup(true);
            return Ok(Resolution::Found(parameter));
        }
        metrics::record_cache_lookup(false);

        let inner = Arc::clone(&self.inner);
        let flight_key = key.clone();
        self.inner
            .flights
            .run(key.clone(), async move { inner.fetch(&flight_key).await })
            .await
            .unwrap_or_else(|_| Err(ResolveError::Abandoned { host: key }))
    }

    /// Cached parameters for `host`, if any.
    pub fn cached(&self, host: &str) -> Option<Arc<SigningParameter>> {
        self.inner
            .cache
            .get(&host.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Whether the parameter store client has been constructed.
    pub fn source_ready(&self) -> bool {
        self.inner.source.is_initialized()
    }

    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }
}

impl std::fmt::Debug for ParameterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterResolver")
            .field("prefix", &self.inner.prefix)
            .field("cached_hosts", &self.inner.cache.len())
            .finish()
    }
}

impl Inner {
    async fn fetch(&self, key: &str) -> ResolveResult {
        // Another episode may have filled the cache since the caller looked.
        let cached = self.cache.get(key).map(|entry| Arc::clone(entry.value()));
        if let Some(parameter) = cached {
            return Ok(Resolution::Found(parameter));
        }

        let base = parameter_path(&self.prefix, key);
        let source = self
            .source
            .get()
            .await
            .map_err(|e| StoreError::Client(e.to_string()))?;

        let entry_prefix = format!("{base}/");
        let mut entries = Vec::new();
        let mut found = 0usize;
        let mut next_token = None;

        loop {
            let query = PathQuery {
                path: base.clone(),
                recursive: true,
                with_decryption: true,
                next_token: next_token.take(),
            };
            let page = match source.get_parameters_by_path(query).await {
                Ok(page) => page,
                Err(e) => {
                    metrics::record_store_query("error");
                    tracing::warn!(host = %key, path = %base, error = %e, "Parameter store query failed");
                    return Err(e.into());
                }
            };
            metrics::record_store_query("ok");

            for stored in page.parameters {
                found += 1;
                let relative = stored.name.strip_prefix(&entry_prefix).unwrap_or(&stored.name);
                if let Some(entry) = ParameterEntry::parse(relative, &stored.value) {
                    entries.push(entry);
                }
            }

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        if found == 0 {
            tracing::info!(host = %key, path = %base, "No signing parameters found");
            metrics::record_parameters_not_found();
            return Ok(Resolution::NotFound);
        }

        let parameter = Arc::new(SigningParameter::from_entries(entries));
        self.cache.insert(key.to_string(), Arc::clone(&parameter));
        metrics::record_cache_size(self.cache.len());
        tracing::info!(host = %key, entries = found, "Signing parameters cached");

        Ok(Resolution::Found(parameter))
    }
}

/// Store path for a host: `/<prefix segments>/<host>`.
pub fn parameter_path(prefix: &str, host: &str) -> String {
    let mut path = String::from("/");
    for segment in prefix.split('/').filter(|s| !s.is_empty()) {
        path.push_str(segment);
        path.push('/');
    }
    path.push_str(host);
    path
}
