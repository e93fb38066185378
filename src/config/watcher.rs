//! Parameters file watcher for hot reload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::loader::load_parameters;
use crate::params::MemoryParameterStore;

/// A watcher that monitors the parameters file for changes.
pub struct ParametersWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<BTreeMap<String, String>>,
}

impl ParametersWatcher {
    /// Create a new ParametersWatcher.
    ///
    /// Returns the watcher and a receiver for reloaded parameter sets.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<BTreeMap<String, String>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Events are delivered on notify's thread;
    /// the returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Parameters file change detected, reloading");
                        match load_parameters(&path) {
                            Ok(parameters) => {
                                let _ = tx.send(parameters);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload parameters; keeping current set");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Parameters watcher started");
        Ok(watcher)
    }
}

/// Apply every reloaded parameter set to `store` until the channel closes.
///
/// Hosts already cached by a resolver keep their parameters.
pub fn apply_updates(
    mut updates: mpsc::UnboundedReceiver<BTreeMap<String, String>>,
    store: Arc<MemoryParameterStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(parameters) = updates.recv().await {
            store.replace(parameters);
        }
    })
}
