//! Per-key call coalescing.
//!
//! The first caller for a key spawns the work and registers a `watch`
//! receiver for it; callers arriving while it runs clone that receiver and
//! wait for the same value. The work runs on its own task, so dropping any
//! caller (including the first) never cancels it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;

/// The in-flight call ended without producing a value (its task panicked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("in-flight call was abandoned")]
pub struct Abandoned;

type Calls<K, V> = Arc<Mutex<HashMap<K, watch::Receiver<Option<V>>>>>;

/// Registry of in-flight calls, keyed by `K`.
pub struct SingleFlight<K, V> {
    calls: Calls<K, V>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the call already in flight for it.
    pub async fn run<F>(&self, key: K, work: F) -> Result<V, Abandoned>
    where
        F: Future<Output = V> + Send + 'static,
    {
        let mut rx = {
            let mut calls = lock(&self.calls);
            if let Some(rx) = calls.get(&key) {
                rx.clone()
            } else {
                let (tx, rx) = watch::channel(None);
                calls.insert(key.clone(), rx.clone());
                let guard = FlightGuard {
                    calls: Arc::clone(&self.calls),
                    key,
                };
                tokio::spawn(async move {
                    let value = work.await;
                    // Unregister before publishing so late arrivals start a fresh call.
                    drop(guard);
                    tx.send_replace(Some(value));
                });
                rx
            }
        };

        let value = rx.wait_for(Option::is_some).await.map_err(|_| Abandoned)?;
        (*value).clone().ok_or(Abandoned)
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the key from the registry when the call completes or its task unwinds.
struct FlightGuard<K: Eq + Hash, V> {
    calls: Calls<K, V>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for FlightGuard<K, V> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
