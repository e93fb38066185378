//! Lazily constructed shared clients.
//!
//! Clients for the parameter store and the invocation target are built on
//! first use rather than at startup. Construction runs at most once: callers
//! racing on an uninitialised client wait for the single constructor, and
//! every later call observes the same instance.

use thiserror::Error;
use tokio::sync::OnceCell;

type Factory<T> = Box<dyn Fn() -> Result<T, String> + Send + Sync>;

/// A client could not be constructed.
#[derive(Debug, Clone, Error)]
#[error("failed to construct {client}: {reason}")]
pub struct ClientInitError {
    pub client: &'static str,
    pub reason: String,
}

/// Get-or-create holder for a shared client.
pub struct LazyClient<T> {
    name: &'static str,
    cell: OnceCell<T>,
    factory: Option<Factory<T>>,
}

impl<T> LazyClient<T> {
    /// Create a holder that builds the client with `factory` on first use.
    ///
    /// A failed construction is not cached; the next call tries again.
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            name,
            cell: OnceCell::new(),
            factory: Some(Box::new(factory)),
        }
    }

    /// Create a holder around an already constructed client.
    pub fn ready(name: &'static str, client: T) -> Self {
        Self {
            name,
            cell: OnceCell::from(client),
            factory: None,
        }
    }

    /// Get the client, constructing it if this is the first use.
    pub async fn get(&self) -> Result<&T, ClientInitError> {
        self.cell
            .get_or_try_init(|| async {
                let factory = self.factory.as_ref().ok_or_else(|| ClientInitError {
                    client: self.name,
                    reason: "no factory configured".to_string(),
                })?;
                tracing::debug!(client = self.name, "Constructing client");
                factory().map_err(|reason| ClientInitError {
                    client: self.name,
                    reason,
                })
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> std::fmt::Debug for LazyClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyClient")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
